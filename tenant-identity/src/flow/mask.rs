/// Obfuscate an identifier for display.
///
/// Emails keep the first two characters of the local part and the domain.
/// Other identifiers keep their last four characters; short ones are fully
/// masked.
pub fn mask_identifier(identifier: &str) -> String {
    let identifier = identifier.trim();

    if let Some((local, domain)) = identifier.rsplit_once('@') {
        let visible: String = local.chars().take(2).collect();
        return format!("{}***@{}", visible, domain);
    }

    let len = identifier.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let tail: String = identifier.chars().skip(len - 4).collect();
    format!("{}{}", "*".repeat(len - 4), tail)
}
