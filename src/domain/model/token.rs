// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Property values and unresolved references.
//!
//! Constructs never see generated attributes of other resources. They hold a
//! [`Token`] instead, and the resolver turns each token into the template
//! intrinsic that the deployment engine evaluates.

use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a resource inside one stack's template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalId(String);

impl LogicalId {
    /// Joins path segments into a logical id, dropping characters the
    /// template format does not accept.
    pub fn from_path(segments: &[&str]) -> Self {
        let id: String = segments
            .iter()
            .flat_map(|s| s.chars())
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        Self(id)
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Logical id of a resource nested under this one.
    pub fn child(&self, name: &str) -> Self {
        Self::from_path(&[&self.0, name])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Values known only to the deployment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    Region,
    AccountId,
    StackName,
    Partition,
    UrlSuffix,
}

impl Pseudo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pseudo::Region => "AWS::Region",
            Pseudo::AccountId => "AWS::AccountId",
            Pseudo::StackName => "AWS::StackName",
            Pseudo::Partition => "AWS::Partition",
            Pseudo::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

/// Placeholder for a value resolved at synthesis or deployment time.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ref(LogicalId),
    GetAtt {
        target: LogicalId,
        attribute: String,
    },
    Parameter(String),
    Pseudo(Pseudo),
    Join {
        delimiter: String,
        parts: Vec<Value>,
    },
    Base64(Box<Value>),
}

impl Token {
    pub fn reference(target: &LogicalId) -> Self {
        Token::Ref(target.clone())
    }

    pub fn get_att(target: &LogicalId, attribute: &str) -> Self {
        Token::GetAtt {
            target: target.clone(),
            attribute: attribute.to_string(),
        }
    }

    pub fn join(delimiter: &str, parts: Vec<Value>) -> Self {
        Token::Join {
            delimiter: delimiter.to_string(),
            parts,
        }
    }

    /// Resource this token points at, if any.
    pub fn target(&self) -> Option<&LogicalId> {
        match self {
            Token::Ref(id) | Token::GetAtt { target: id, .. } => Some(id),
            _ => None,
        }
    }
}

/// A property value that may still contain unresolved tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Token(Token),
}

impl Value {
    /// Calls `f` for every token in this value, including tokens nested
    /// inside `Join` and `Base64`.
    pub fn visit_tokens<'a>(&'a self, f: &mut dyn FnMut(&'a Token)) {
        match self {
            Value::List(items) => {
                for v in items {
                    v.visit_tokens(f);
                }
            }
            Value::Map(map) => {
                for v in map.values() {
                    v.visit_tokens(f);
                }
            }
            Value::Token(token) => {
                f(token);
                match token {
                    Token::Join { parts, .. } => {
                        for v in parts {
                            v.visit_tokens(f);
                        }
                    }
                    Token::Base64(inner) => inner.visit_tokens(f),
                    _ => {}
                }
            }
            Value::Bool(_) | Value::Int(_) | Value::Str(_) => {}
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view; numeric strings count because several resource types
    /// carry counts as strings.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Value::Token(t) => Some(t),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u16> for Value {
    fn from(i: u16) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Token> for Value {
    fn from(t: Token) -> Self {
        Value::Token(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Props> for Value {
    fn from(props: Props) -> Self {
        Value::Map(props.0)
    }
}

/// Ordered property bag with a chaining setter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(BTreeMap<String, Value>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Sets `key` only when a value is present.
    pub fn with_opt(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `[{Key, Value}]` tag list.
pub fn tags(pairs: &[(&str, &str)]) -> Value {
    Value::List(
        pairs
            .iter()
            .map(|(k, v)| Props::new().with("Key", *k).with("Value", *v).into())
            .collect(),
    )
}
