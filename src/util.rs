//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values, in order.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings (cuts on a char boundary).
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_placeholders_in_order() {
    let out = fill_template("{a} then {b}", &[("b", "{a}"), ("a", "x")]);
    assert_eq!(out, "x then x");
    let out = fill_template("{a} then {b}", &[("a", "{b}"), ("b", "y")]);
    assert_eq!(out, "y then y");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    let out = trunc_for_log("ééé", 3);
    assert!(out.starts_with('é'));
    assert!(out.ends_with("(6 bytes total)"));
  }
}
