// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type name spellings.
//!
//! A type name shows up in three equivalent forms:
//!
//! | Form | Example |
//! |------|---------|
//! | binary (dotted) | `java.lang.String` |
//! | internal (slashed) | `java/lang/String` |
//! | descriptor | `Ljava/lang/String;` |
//!
//! The conversions accept any of the three as input. A name is only treated as
//! a descriptor when it both starts with `L` and ends with `;`, so internal
//! names such as `Lever/Arm` are left alone.

fn strip_descriptor(name: &str) -> &str {
    if name.len() > 2 && name.starts_with('L') && name.ends_with(';') {
        &name[1..name.len() - 1]
    } else {
        name
    }
}

/// Convert to the internal (slashed) form: `a/b/C`.
pub fn to_internal_name(name: &str) -> String {
    strip_descriptor(name).replace('.', "/")
}

/// Convert to the binary (dotted) form: `a.b.C`.
pub fn to_binary_name(name: &str) -> String {
    strip_descriptor(name).replace('/', ".")
}

/// Convert to the field-descriptor form: `La/b/C;`.
pub fn to_descriptor(name: &str) -> String {
    format!("L{};", to_internal_name(name))
}

/// Last segment of a name in any spelling (`a/b/C` -> `C`).
pub fn simple_name(name: &str) -> &str {
    let stripped = strip_descriptor(name);
    stripped
        .rsplit(['/', '.'])
        .next()
        .unwrap_or(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_name_from_every_spelling() {
        assert_eq!(to_binary_name("java/lang/String"), "java.lang.String");
        assert_eq!(to_binary_name("Ljava/lang/String;"), "java.lang.String");
        assert_eq!(to_binary_name("java.lang.String"), "java.lang.String");
    }

    #[test]
    fn test_internal_name_from_every_spelling() {
        assert_eq!(to_internal_name("java/lang/String"), "java/lang/String");
        assert_eq!(to_internal_name("Ljava/lang/String;"), "java/lang/String");
        assert_eq!(to_internal_name("java.lang.String"), "java/lang/String");
    }

    #[test]
    fn test_descriptor_from_every_spelling() {
        assert_eq!(to_descriptor("java/lang/String"), "Ljava/lang/String;");
        assert_eq!(to_descriptor("Ljava/lang/String;"), "Ljava/lang/String;");
        assert_eq!(to_descriptor("java.lang.String"), "Ljava/lang/String;");
    }

    #[test]
    fn test_leading_l_is_not_a_descriptor() {
        assert_eq!(to_internal_name("Lever/Arm"), "Lever/Arm");
        assert_eq!(to_descriptor("Lever.Arm"), "LLever/Arm;");
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(simple_name("com/example/Point"), "Point");
        assert_eq!(simple_name("com.example.Point"), "Point");
        assert_eq!(simple_name("Lcom/example/Point;"), "Point");
        assert_eq!(simple_name("Point"), "Point");
    }
}
