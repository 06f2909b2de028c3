/// Turn a camelCase identifier into a "Title Case" display label.
///
/// A space goes in front of every uppercase ASCII letter after the first
/// character, and the first character is uppercased: `cpuLoadTest` becomes
/// `Cpu Load Test`.
pub fn title_case_label(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    let mut chars = ident.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
    }
    for ch in chars {
        if ch.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}
