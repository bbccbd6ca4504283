//! Parsed class definitions
//!
//! The parser's output format: one serde document per class. Field order
//! and method order are significant: they become the suite's member
//! table order.

use crate::error::LoadError;
use crate::instruction::SourceInstruction;
use chirp_suite::member::modifiers;
use serde::{Deserialize, Serialize};

/// A parsed class, ready for installation into a suite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassDefinition {
    /// Internal name, `/`-separated.
    pub name: String,
    #[serde(default)]
    pub interface: bool,
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Defaults to the root object class when absent.
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Never exported from the suite, regardless of access modifiers.
    #[serde(default)]
    pub internal: bool,
    /// Exported for dynamic lookup from other suites.
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub methods: Vec<MethodDefinition>,
}

/// A declared field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

/// A declared method. `body` must be empty exactly when the method is
/// abstract, native or hosted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDefinition {
    pub name: String,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default = "default_return_type")]
    pub return_type: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub body: Vec<SourceInstruction>,
    #[serde(default)]
    pub handlers: Vec<HandlerDefinition>,
}

fn default_return_type() -> String {
    "void".to_string()
}

/// A declared exception handler; only the catch type matters to linking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerDefinition {
    pub catch_type: String,
}

fn parse_modifier(name: &str, context: &str, allow_member: bool) -> Result<u32, LoadError> {
    match name {
        "public" => Ok(modifiers::PUBLIC),
        "protected" => Ok(modifiers::PROTECTED),
        "final" => Ok(modifiers::FINAL),
        "abstract" => Ok(modifiers::ABSTRACT),
        "private" if allow_member => Ok(modifiers::PRIVATE),
        "native" if allow_member => Ok(modifiers::NATIVE),
        "hosted" if allow_member => Ok(modifiers::HOSTED),
        _ => Err(LoadError::UnknownModifier {
            modifier: name.to_string(),
            context: context.to_string(),
        }),
    }
}

/// Folds class modifier strings into a bit set.
pub fn parse_class_modifiers(names: &[String], context: &str) -> Result<u32, LoadError> {
    names.iter().try_fold(0u32, |acc, n| {
        Ok(acc | parse_modifier(n, context, false)?)
    })
}

/// Folds member modifier strings into a bit set.
pub fn parse_member_modifiers(names: &[String], context: &str) -> Result<u32, LoadError> {
    names.iter().try_fold(0u32, |acc, n| {
        Ok(acc | parse_modifier(n, context, true)?)
    })
}
