//! Repository descriptors for console types.

use crate::repository::{Resource, ResourceDescriptor};

use super::types::{Application, Bucket, Product, WaitlistProject};

impl Resource for Bucket {
  const DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    list_key: "buckets",
    collection: "/buckets",
    list_field: "buckets",
    item_field: "bucket",
    plural: "buckets",
    singular: "bucket",
  };

  fn id(&self) -> String {
    self.id.to_string()
  }
}

impl Resource for Application {
  const DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    list_key: "apps",
    collection: "/apps",
    list_field: "apps",
    item_field: "app",
    plural: "applications",
    singular: "application",
  };

  fn id(&self) -> String {
    self.id.to_string()
  }
}

impl Resource for Product {
  const DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    list_key: "products",
    collection: "/products",
    list_field: "products",
    item_field: "product",
    plural: "products",
    singular: "product",
  };

  fn id(&self) -> String {
    self.id.to_string()
  }
}

impl Resource for WaitlistProject {
  const DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    list_key: "waitlists",
    collection: "/waitlists",
    list_field: "waitlists",
    item_field: "waitlist",
    plural: "waitlist projects",
    singular: "waitlist project",
  };

  fn id(&self) -> String {
    self.id.to_string()
  }
}
