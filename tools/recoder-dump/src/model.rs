// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML model of records and the components to add to them.

use anyhow::{bail, Context};
use recoder::classfile::{ClassDef, FieldType, ObjectMethod, RecordBuilder};
use recoder::{ComponentKey, ComponentKeyRegistry, Value};
use serde::{Deserialize, Serialize};

/// Model root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub records: Vec<RecordSpec>,
    #[serde(default)]
    pub keys: Vec<KeySpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSpec {
    pub name: String,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    /// Derived methods the record does not define (`equals`, `hashCode`, `toString`).
    #[serde(default)]
    pub omit: Vec<String>,
    /// Emit an explicit, empty static initializer.
    #[serde(default)]
    pub static_initializer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySpec {
    pub field: String,
    pub target: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
}

/// Field type from a Java keyword, a descriptor, or a type name.
pub fn parse_type(text: &str) -> anyhow::Result<FieldType> {
    Ok(match text {
        "boolean" => FieldType::Boolean,
        "byte" => FieldType::Byte,
        "char" => FieldType::Char,
        "short" => FieldType::Short,
        "int" => FieldType::Int,
        "long" => FieldType::Long,
        "float" => FieldType::Float,
        "double" => FieldType::Double,
        t if t.starts_with('[') || (t.starts_with('L') && t.ends_with(';')) => {
            FieldType::parse(t).with_context(|| format!("bad descriptor '{}'", t))?
        }
        "" => bail!("empty type name"),
        t => FieldType::object(t),
    })
}

/// Zero value of a parameter type.
pub fn zero_value(ty: &FieldType) -> Value {
    match ty {
        FieldType::Boolean => Value::Bool(false),
        FieldType::Byte => Value::Byte(0),
        FieldType::Char => Value::Char('\0'),
        FieldType::Short => Value::Short(0),
        FieldType::Int => Value::Int(0),
        FieldType::Long => Value::Long(0),
        FieldType::Float => Value::Float(0.0),
        FieldType::Double => Value::Double(0.0),
        FieldType::Object(_) | FieldType::Array(_) => Value::Null,
    }
}

/// Primitive behind a box type name, so `java.lang.Long` defaults parse like `long`.
fn unboxed(ty: &FieldType) -> FieldType {
    let FieldType::Object(name) = ty else {
        return ty.clone();
    };
    match name.as_str() {
        "java/lang/Boolean" => FieldType::Boolean,
        "java/lang/Byte" => FieldType::Byte,
        "java/lang/Character" => FieldType::Char,
        "java/lang/Short" => FieldType::Short,
        "java/lang/Integer" => FieldType::Int,
        "java/lang/Long" => FieldType::Long,
        "java/lang/Float" => FieldType::Float,
        "java/lang/Double" => FieldType::Double,
        _ => ty.clone(),
    }
}

/// Runtime value of a YAML scalar, shaped by the declared type.
fn yaml_to_value(yaml: &serde_yaml::Value, ty: &FieldType) -> anyhow::Result<Value> {
    use serde_yaml::Value as Y;
    let ty = unboxed(ty);
    let value = match (yaml, &ty) {
        (Y::Null, _) => Value::Null,
        (Y::Bool(b), _) => Value::Bool(*b),
        (Y::Number(n), FieldType::Long) => {
            Value::Long(n.as_i64().context("long default must be an integer")?)
        }
        (Y::Number(n), FieldType::Double) => {
            Value::Double(n.as_f64().context("double default must be a number")?)
        }
        (Y::Number(n), FieldType::Float) => {
            Value::Float(n.as_f64().context("float default must be a number")? as f32)
        }
        (Y::Number(n), FieldType::Short) => Value::Short(
            i16::try_from(n.as_i64().context("short default must be an integer")?)
                .context("short default out of range")?,
        ),
        (Y::Number(n), FieldType::Byte) => Value::Byte(
            i8::try_from(n.as_i64().context("byte default must be an integer")?)
                .context("byte default out of range")?,
        ),
        (Y::Number(n), FieldType::Int) => Value::Int(
            i32::try_from(n.as_i64().context("int default must be an integer")?)
                .context("int default out of range")?,
        ),
        (Y::Number(n), other) => bail!("numeric default {} for non-numeric type {}", n, other),
        (Y::String(s), FieldType::Char) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => bail!("char default must be one character, got '{}'", s),
            }
        }
        (Y::String(s), _) => Value::from(s.as_str()),
        (other, _) => bail!("unsupported default {:?}", other),
    };
    Ok(value)
}

impl Model {
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let model: Model = serde_yaml::from_str(yaml).context("invalid model")?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (i, record) in self.records.iter().enumerate() {
            if record.name.is_empty() {
                bail!("records[{}]: empty name", i);
            }
            for omitted in &record.omit {
                if !ObjectMethod::ALL.iter().any(|m| m.method_name() == omitted.as_str()) {
                    bail!("{}: cannot omit unknown method '{}'", record.name, omitted);
                }
            }
        }
        for (i, key) in self.keys.iter().enumerate() {
            if key.field.is_empty() || key.target.is_empty() {
                bail!("keys[{}]: field and target are required", i);
            }
        }
        Ok(())
    }

    /// Record definitions, as a compiler would emit them.
    pub fn class_defs(&self) -> anyhow::Result<Vec<ClassDef>> {
        self.records
            .iter()
            .map(|record| {
                let mut builder = RecordBuilder::new(&record.name);
                for comp in &record.components {
                    let ty = parse_type(&comp.ty)
                        .with_context(|| format!("{}.{}", record.name, comp.name))?;
                    builder = builder.component(&comp.name, ty);
                }
                for method in ObjectMethod::ALL {
                    if record.omit.iter().any(|o| o == method.method_name()) {
                        builder = builder.without(method);
                    }
                }
                if record.static_initializer {
                    builder = builder.static_initializer(Vec::new());
                }
                Ok(builder.build())
            })
            .collect()
    }

    /// Register every key into `registry`.
    pub fn register_keys(&self, registry: &ComponentKeyRegistry) -> anyhow::Result<()> {
        for key in &self.keys {
            let ty = parse_type(&key.ty).with_context(|| format!("key '{}'", key.field))?;
            let type_name = recoder::value::boxed_type_name(&ty);
            let created = match &key.default {
                Some(default) => {
                    let default = yaml_to_value(default, &ty)
                        .with_context(|| format!("default of key '{}'", key.field))?;
                    ComponentKey::<Value>::create_with_default(
                        &key.field,
                        &key.target,
                        &type_name,
                        default,
                    )
                }
                None => ComponentKey::<Value>::create(&key.field, &key.target, &type_name),
            };
            registry.register(created);
        }
        Ok(())
    }
}
