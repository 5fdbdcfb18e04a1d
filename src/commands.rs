/// Resource names and the matching logic behind `consolectl list <resource>`

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
  Buckets,
  Apps,
  Products,
  Waitlists,
}

#[derive(Debug, Clone)]
pub struct ResourceName {
  pub kind: ResourceKind,
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All resources the console can manage
pub const RESOURCES: &[ResourceName] = &[
  ResourceName {
    kind: ResourceKind::Buckets,
    name: "buckets",
    aliases: &["b", "bucket", "bkt", "store"],
    description: "Data buckets in the bucket store",
  },
  ResourceName {
    kind: ResourceKind::Apps,
    name: "apps",
    aliases: &["a", "app", "application", "applications", "auth"],
    description: "Applications registered for authentication",
  },
  ResourceName {
    kind: ResourceKind::Products,
    name: "products",
    aliases: &["p", "product", "marketplace", "listings"],
    description: "Marketplace listings",
  },
  ResourceName {
    kind: ResourceKind::Waitlists,
    name: "waitlists",
    aliases: &["w", "waitlist", "wl", "projects"],
    description: "Waitlist projects",
  },
];

/// Get matching resources for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static ResourceName> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return RESOURCES.iter().collect();
  }

  let mut matches: Vec<(&ResourceName, u32)> = Vec::new();

  for res in RESOURCES {
    // Exact match on name
    if res.name == input_lower {
      matches.push((res, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if res.aliases.contains(&input_lower.as_str()) {
      matches.push((res, 1));
      continue;
    }

    // Prefix match on name
    if res.name.starts_with(&input_lower) {
      matches.push((res, 2));
      continue;
    }

    // Prefix match on alias
    if res.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((res, 3));
      continue;
    }

    // Fuzzy match (contains)
    if res.name.contains(&input_lower) {
      matches.push((res, 4));
      continue;
    }

    // Fuzzy match on alias
    if res.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((res, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(res, _)| res).collect()
}

/// Resolve user input to the best-ranked resource kind.
pub fn resolve(input: &str) -> Result<ResourceKind, String> {
  let suggestions = get_suggestions(input);

  match suggestions.first() {
    Some(best) if !input.trim().is_empty() => Ok(best.kind),
    _ => Err(unknown_resource(input)),
  }
}

/// Resolve input for commands that change data: only a full name or alias counts.
pub fn resolve_exact(input: &str) -> Result<ResourceKind, String> {
  let input_lower = input.trim().to_lowercase();

  RESOURCES
    .iter()
    .find(|r| r.name == input_lower || r.aliases.contains(&input_lower.as_str()))
    .map(|r| r.kind)
    .ok_or_else(|| unknown_resource(input))
}

fn unknown_resource(input: &str) -> String {
  let names: Vec<&str> = RESOURCES.iter().map(|r| r.name).collect();
  format!(
    "Unknown resource '{}'. Expected one of: {}",
    input,
    names.join(", ")
  )
}
