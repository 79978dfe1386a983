/// Lowercased alphanumerics only, so `list-apps`, `ListApps` and `list_apps`
/// compare equal.
fn normalize_token(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

fn distance(input: &str, candidate: &str) -> Option<usize> {
    if input.is_empty() || candidate.is_empty() {
        return None;
    }
    if input == candidate {
        return Some(0);
    }
    if candidate.contains(input) || input.contains(candidate) {
        return Some(1);
    }
    Some(levenshtein(input, candidate))
}

fn max_allowed_distance(len: usize) -> usize {
    match len {
        0 => 0,
        1..=4 => 1,
        5..=8 => 2,
        _ => (len / 3).max(3),
    }
}

/// Up to `limit` candidates close to `input`, best first.
pub fn suggest(input: &str, candidates: &[String], limit: usize) -> Vec<String> {
    let needle = normalize_token(input);
    let allowed = max_allowed_distance(needle.len());

    let mut scored: Vec<(usize, &String)> = candidates
        .iter()
        .filter_map(|candidate| {
            distance(&needle, &normalize_token(candidate))
                .filter(|score| *score <= allowed)
                .map(|score| (score, candidate))
        })
        .collect();
    scored.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.len().cmp(&b.1.len()))
            .then_with(|| a.1.cmp(b.1))
    });
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(limit.max(1))
        .map(|(_, candidate)| candidate.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::suggest;

    fn tools() -> Vec<String> {
        ["list_apps", "get_app_info", "list_devices", "list_users", "list_bundle_ids"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn suggests_close_tool_names() {
        assert_eq!(suggest("list_app", &tools(), 3)[0], "list_apps");
        assert_eq!(suggest("listDevices", &tools(), 3), vec!["list_devices"]);
    }

    #[test]
    fn unrelated_input_yields_nothing() {
        assert!(suggest("upload_build", &tools(), 3).is_empty());
        assert!(suggest("", &tools(), 3).is_empty());
    }
}
