/// Longest prefix of `value` that fits in `max_bytes` without splitting a
/// UTF-8 sequence.
pub fn truncate_utf8_prefix(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::truncate_utf8_prefix;

    #[test]
    fn keeps_short_values_whole() {
        assert_eq!(truncate_utf8_prefix("com.example.app", 64), "com.example.app");
        assert_eq!(truncate_utf8_prefix("abc", 0), "");
    }

    #[test]
    fn never_splits_multibyte_characters() {
        assert_eq!(truncate_utf8_prefix("Zoë's iPhone", 3), "Zo");
        assert_eq!(truncate_utf8_prefix("Zoë's iPhone", 4), "Zoë");
    }
}
