// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Text listing of a type definition.

use super::{AccessFlags, ClassDef};
use std::fmt::Write;

fn flag_words(access: AccessFlags) -> String {
    let mut words = Vec::new();
    if access.contains(AccessFlags::PUBLIC) {
        words.push("public");
    }
    if access.contains(AccessFlags::PRIVATE) {
        words.push("private");
    }
    if access.contains(AccessFlags::STATIC) {
        words.push("static");
    }
    if access.contains(AccessFlags::FINAL) {
        words.push("final");
    }
    if access.contains(AccessFlags::SYNTHETIC) {
        words.push("synthetic");
    }
    let mut out = words.join(" ");
    if !out.is_empty() {
        out.push(' ');
    }
    out
}

/// Render `class` as a javap-like listing.
pub fn render(class: &ClassDef) -> String {
    let mut out = String::new();
    let kind = if class.access.contains(AccessFlags::RECORD) {
        "record"
    } else {
        "class"
    };
    // Writing to a String cannot fail.
    let _ = writeln!(
        out,
        "{}{} {} extends {} {{",
        flag_words(class.access),
        kind,
        class.name,
        class.super_name
    );

    if !class.components.is_empty() {
        let _ = writeln!(out);
        for comp in &class.components {
            match &comp.facing_name {
                Some(facing) => {
                    let _ = writeln!(
                        out,
                        "  component {}: {} (facing {})",
                        comp.name, comp.descriptor, facing
                    );
                }
                None => {
                    let _ = writeln!(out, "  component {}: {}", comp.name, comp.descriptor);
                }
            }
        }
    }

    if !class.fields.is_empty() {
        let _ = writeln!(out);
        for field in &class.fields {
            let _ = writeln!(
                out,
                "  {}{}: {}",
                flag_words(field.access),
                field.name,
                field.descriptor
            );
        }
    }

    for method in &class.methods {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  {}{}{}",
            flag_words(method.access),
            method.name,
            method.descriptor
        );
        for (pc, insn) in method.code.iter().enumerate() {
            let _ = writeln!(out, "    {:>3}: {}", pc, insn);
        }
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{FieldType, RecordBuilder};

    #[test]
    fn test_render_point() {
        let mut class = RecordBuilder::new("com/example/Point")
            .component("x", FieldType::Int)
            .build();
        class.components[0].facing_name = Some("abscissa".into());
        let text = render(&class);
        assert!(text.starts_with("public final record com/example/Point extends java/lang/Record {"));
        assert!(text.contains("component x: I (facing abscissa)"));
        assert!(text.contains("private final x: I"));
        assert!(text.contains("public <init>(I)V"));
        assert!(text.contains("putfield com/example/Point.x:I"));
        assert!(text.trim_end().ends_with('}'));
    }
}
