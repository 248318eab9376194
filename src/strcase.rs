/// Convert a camelCase field name to the snake_case storage convention.
///
/// Consecutive capitals stay grouped: `tenantID` becomes `tenant_id`,
/// `HTTPStatus` becomes `http_status`.
pub(crate) fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (index, c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let after_lower = index > 0
                && (chars[index - 1].is_ascii_lowercase() || chars[index - 1].is_ascii_digit());
            let before_lower = chars
                .get(index + 1)
                .is_some_and(|next| next.is_ascii_lowercase());
            if index > 0 && (after_lower || before_lower) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(*c);
        }
    }

    out
}
