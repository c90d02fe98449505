// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field and method descriptors.

use crate::config::OBJECT;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Malformed descriptor text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("empty descriptor")]
    Empty,
    #[error("unexpected character '{found}' at {offset} in '{descriptor}'")]
    Unexpected {
        descriptor: String,
        offset: usize,
        found: char,
    },
    #[error("unterminated object type in '{0}'")]
    Unterminated(String),
    #[error("trailing characters in '{0}'")]
    Trailing(String),
}

/// Type of a field, parameter or component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// Reference type by internal name.
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Reference type from a name in any spelling.
    pub fn object(name: &str) -> Self {
        Self::Object(crate::names::to_internal_name(name))
    }

    /// `Ljava/lang/Object;`
    pub fn any_object() -> Self {
        Self::Object(OBJECT.to_string())
    }

    /// Check if this is a primitive type.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Object(_) | Self::Array(_))
    }

    /// Internal name for reference types.
    pub fn internal_name(&self) -> Option<&str> {
        match self {
            Self::Object(name) => Some(name),
            _ => None,
        }
    }

    /// Parse a single field descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        if descriptor.is_empty() {
            return Err(DescriptorError::Empty);
        }
        let (ty, consumed) = parse_at(descriptor, 0)?;
        if consumed != descriptor.len() {
            return Err(DescriptorError::Trailing(descriptor.to_string()));
        }
        Ok(ty)
    }

    fn write_descriptor(&self, out: &mut String) {
        match self {
            Self::Boolean => out.push('Z'),
            Self::Byte => out.push('B'),
            Self::Char => out.push('C'),
            Self::Short => out.push('S'),
            Self::Int => out.push('I'),
            Self::Long => out.push('J'),
            Self::Float => out.push('F'),
            Self::Double => out.push('D'),
            Self::Object(name) => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            Self::Array(elem) => {
                out.push('[');
                elem.write_descriptor(out);
            }
        }
    }
}

/// Parse one field type starting at `offset`; returns the type and the end offset.
fn parse_at(text: &str, offset: usize) -> Result<(FieldType, usize), DescriptorError> {
    let bytes = text.as_bytes();
    let Some(&b) = bytes.get(offset) else {
        return Err(DescriptorError::Unterminated(text.to_string()));
    };
    let ty = match b {
        b'Z' => FieldType::Boolean,
        b'B' => FieldType::Byte,
        b'C' => FieldType::Char,
        b'S' => FieldType::Short,
        b'I' => FieldType::Int,
        b'J' => FieldType::Long,
        b'F' => FieldType::Float,
        b'D' => FieldType::Double,
        b'L' => {
            let rest = &text[offset + 1..];
            let end = rest
                .find(';')
                .ok_or_else(|| DescriptorError::Unterminated(text.to_string()))?;
            if end == 0 {
                return Err(DescriptorError::Unexpected {
                    descriptor: text.to_string(),
                    offset: offset + 1,
                    found: ';',
                });
            }
            return Ok((
                FieldType::Object(rest[..end].to_string()),
                offset + 1 + end + 1,
            ));
        }
        b'[' => {
            let (elem, next) = parse_at(text, offset + 1)?;
            return Ok((FieldType::Array(Box::new(elem)), next));
        }
        _ => {
            return Err(DescriptorError::Unexpected {
                descriptor: text.to_string(),
                offset,
                found: text[offset..].chars().next().unwrap_or('?'),
            })
        }
    };
    Ok((ty, offset + 1))
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        f.write_str(&out)
    }
}

impl FromStr for FieldType {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Method descriptor: parameter types and optional return type (`None` = void).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    /// Create a method descriptor.
    pub fn new(params: Vec<FieldType>, ret: Option<FieldType>) -> Self {
        Self { params, ret }
    }

    /// `()V`
    pub fn void() -> Self {
        Self::new(Vec::new(), None)
    }

    /// Void method taking `params` (constructor shape).
    pub fn void_with(params: Vec<FieldType>) -> Self {
        Self::new(params, None)
    }

    /// No-argument method returning `ret` (accessor shape).
    pub fn returning(ret: FieldType) -> Self {
        Self::new(Vec::new(), Some(ret))
    }

    /// Same descriptor with `count` extra parameters of type `ty` appended.
    pub fn with_appended_params(&self, count: usize, ty: &FieldType) -> Self {
        let mut params = self.params.clone();
        params.extend(std::iter::repeat(ty.clone()).take(count));
        Self::new(params, self.ret.clone())
    }

    /// Parse `(..)R` text.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        if descriptor.is_empty() {
            return Err(DescriptorError::Empty);
        }
        if !descriptor.starts_with('(') {
            return Err(DescriptorError::Unexpected {
                descriptor: descriptor.to_string(),
                offset: 0,
                found: descriptor.chars().next().unwrap_or('?'),
            });
        }
        let mut params = Vec::new();
        let mut offset = 1;
        loop {
            match descriptor.as_bytes().get(offset) {
                Some(b')') => break,
                Some(_) => {
                    let (ty, next) = parse_at(descriptor, offset)?;
                    params.push(ty);
                    offset = next;
                }
                None => return Err(DescriptorError::Unterminated(descriptor.to_string())),
            }
        }
        let ret_text = &descriptor[offset + 1..];
        let ret = if ret_text == "V" {
            None
        } else {
            Some(FieldType::parse(ret_text).map_err(|err| match err {
                DescriptorError::Empty => DescriptorError::Unterminated(descriptor.to_string()),
                other => other,
            })?)
        };
        Ok(Self { params, ret })
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from("(");
        for param in &self.params {
            param.write_descriptor(&mut out);
        }
        out.push(')');
        match &self.ret {
            Some(ret) => ret.write_descriptor(&mut out),
            None => out.push('V'),
        }
        f.write_str(&out)
    }
}

impl FromStr for MethodDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Descriptors travel as their text form in exported definitions.

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

impl Serialize for MethodDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MethodDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
