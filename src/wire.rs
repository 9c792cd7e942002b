// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Converting node trees to and from JSON.
//!
//! Literals are written as bare JSON numbers and strings.  Every other node is a JSON object
//! with a single `*fab` key, whose value describes the node:
//!
//! ```json
//! {
//!   "*fab": {
//!     "*type": "list",
//!     "*item_list": [1, 2.5, "three", {"*fab": {"*type": "reference", "*memo_id": 0}}],
//!     "*memo_id": 0
//!   }
//! }
//! ```
//!
//! | key          | used by                                 | holds                          |
//! |--------------|-----------------------------------------|--------------------------------|
//! | `*type`      | every node                              | one of the [`tags`][]          |
//! | `*memo_id`   | list, tuple, dict, instance, reference  | a non-negative integer         |
//! | `*item_list` | list, tuple                             | an array of nodes              |
//! | `*item_dict` | dict, instance                          | the key/value pairs, see below |
//! | `*module`    | type, instance                          | the class's module             |
//! | `*class`     | type, instance                          | the class's name               |
//! | `*state`     | float                                   | `"nan"`, `"inf"`, or `"-inf"`  |
//!
//! `*item_dict` is a JSON object when every key is a distinct string, which is always the case
//! for instance fields.  Otherwise it is a flat array of alternating keys and values.
//!
//! Floats that JSON cannot represent (NaN and the infinities) are written as `float` nodes.
//! Integers and floats are told apart by their JSON spelling, so `1` loads as an integer and
//! `1.0` as a float.
//!
//! Each level of node nesting costs up to three levels of JSON nesting, and JSON parsers limit
//! how deeply they will recurse.  Trees with a node more than [`MAX_DEPTH`][] levels below the
//! root are refused with [`WireError::NestingTooDeep`][] in both directions, so that anything
//! this module writes it can also read back.

use std::collections::HashSet;
use std::convert::TryFrom;

use serde_json::Map;
use serde_json::Number;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::node::into_pairs;
use crate::node::Literal;
use crate::node::MalformedPairSequence;
use crate::node::MemoId;
use crate::node::Node;
use crate::node::TypePath;

/// Object keys.
pub mod keys {
    /// Marks a JSON object as a node.
    pub const FAB_MARK: &str = "*fab";
    pub const TYPE: &str = "*type";
    pub const MODULE: &str = "*module";
    pub const CLASS: &str = "*class";
    pub const STATE: &str = "*state";
    pub const MEMO_ID: &str = "*memo_id";
    pub const ITEM_LIST: &str = "*item_list";
    pub const ITEM_DICT: &str = "*item_dict";
}

/// Values of the `*type` key.
pub mod tags {
    pub const TYPE: &str = "type";
    pub const CLASS_INSTANCE: &str = "class_instance";
    pub const REFERENCE: &str = "reference";
    pub const LIST: &str = "list";
    pub const TUPLE: &str = "tuple";
    pub const DICT: &str = "dict";
    pub const FLOAT: &str = "float";
}

/// How far below the root a node may sit.  At this depth the encoded JSON is still inside the
/// 127 levels of nesting that `serde_json` will parse.
pub const MAX_DEPTH: usize = 41;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("node is missing key {0}")]
    MissingKey(&'static str),
    #[error("key {key} must hold {expected}")]
    WrongKind {
        key: &'static str,
        expected: &'static str,
    },
    #[error("unknown node type {0:?}")]
    UnknownTag(String),
    #[error("expected a node, found {0}")]
    NotANode(&'static str),
    #[error("integer {0} does not fit in a signed 64-bit integer")]
    IntegerOutOfRange(String),
    #[error("invalid float state {0:?}")]
    InvalidFloatState(String),
    #[error("node tree nests deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error(transparent)]
    MalformedPairSequence(#[from] MalformedPairSequence),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

//-------------------------------------------------------------------------------------------------
// Encoding

pub fn to_json(node: &Node) -> Result<JsonValue, WireError> {
    encode(node, 0)
}

fn encode(node: &Node, depth: usize) -> Result<JsonValue, WireError> {
    if depth > MAX_DEPTH {
        return Err(WireError::NestingTooDeep(MAX_DEPTH));
    }
    let mut info = Map::new();
    match node {
        Node::Literal(Literal::Int(value)) => return Ok(JsonValue::from(*value)),
        Node::Literal(Literal::Float(value)) => match Number::from_f64(*value) {
            Some(number) => return Ok(JsonValue::Number(number)),
            None => {
                info.insert(keys::TYPE.into(), tags::FLOAT.into());
                info.insert(keys::STATE.into(), float_state(*value).into());
            }
        },
        Node::Literal(Literal::Str(value)) => return Ok(JsonValue::String(value.clone())),
        Node::Reference(memo_id) => {
            info.insert(keys::TYPE.into(), tags::REFERENCE.into());
            info.insert(keys::MEMO_ID.into(), memo_id.as_usize().into());
        }
        Node::List { memo_id, items } | Node::Tuple { memo_id, items } => {
            let tag = if let Node::List { .. } = node {
                tags::LIST
            } else {
                tags::TUPLE
            };
            info.insert(keys::TYPE.into(), tag.into());
            let items = items
                .iter()
                .map(|item| encode(item, depth + 1))
                .collect::<Result<_, _>>()?;
            info.insert(keys::ITEM_LIST.into(), JsonValue::Array(items));
            info.insert(keys::MEMO_ID.into(), memo_id.as_usize().into());
        }
        Node::Dict { memo_id, items } => {
            info.insert(keys::TYPE.into(), tags::DICT.into());
            info.insert(keys::ITEM_DICT.into(), encode_pairs(items, depth + 1)?);
            info.insert(keys::MEMO_ID.into(), memo_id.as_usize().into());
        }
        Node::Type(path) => {
            info.insert(keys::TYPE.into(), tags::TYPE.into());
            info.insert(keys::CLASS.into(), path.name.clone().into());
            info.insert(keys::MODULE.into(), path.module.clone().into());
        }
        Node::Instance {
            type_path,
            memo_id,
            attributes,
        } => {
            info.insert(keys::TYPE.into(), tags::CLASS_INSTANCE.into());
            info.insert(keys::CLASS.into(), type_path.name.clone().into());
            info.insert(keys::MODULE.into(), type_path.module.clone().into());
            info.insert(keys::MEMO_ID.into(), memo_id.as_usize().into());
            info.insert(keys::ITEM_DICT.into(), encode_pairs(attributes, depth + 1)?);
        }
    }
    let mut marked = Map::new();
    marked.insert(keys::FAB_MARK.into(), JsonValue::Object(info));
    Ok(JsonValue::Object(marked))
}

fn float_state(value: f64) -> &'static str {
    if value.is_nan() {
        "nan"
    } else if value > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

/// Encodes the pairs of a node whose children sit at `depth`.
fn encode_pairs(pairs: &[(Node, Node)], depth: usize) -> Result<JsonValue, WireError> {
    let mut names = HashSet::new();
    let string_keys = pairs.iter().all(|(key, _)| match key {
        Node::Literal(Literal::Str(name)) => names.insert(name.as_str()),
        _ => false,
    });
    if string_keys {
        let mut map = Map::new();
        for (key, value) in pairs {
            if let Node::Literal(Literal::Str(name)) = key {
                map.insert(name.clone(), encode(value, depth)?);
            }
        }
        Ok(JsonValue::Object(map))
    } else {
        let mut flat = Vec::with_capacity(pairs.len() * 2);
        for (key, value) in pairs {
            flat.push(encode(key, depth)?);
            flat.push(encode(value, depth)?);
        }
        Ok(JsonValue::Array(flat))
    }
}

pub fn to_string(node: &Node, pretty: bool) -> Result<String, WireError> {
    let json = to_json(node)?;
    let text = if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    Ok(text)
}

//-------------------------------------------------------------------------------------------------
// Decoding

pub fn from_json(json: &JsonValue) -> Result<Node, WireError> {
    decode(json, 0)
}

fn decode(json: &JsonValue, depth: usize) -> Result<Node, WireError> {
    if depth > MAX_DEPTH {
        return Err(WireError::NestingTooDeep(MAX_DEPTH));
    }
    match json {
        JsonValue::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(Literal::Int(value).into())
            } else if number.is_u64() {
                Err(WireError::IntegerOutOfRange(number.to_string()))
            } else {
                match number.as_f64() {
                    Some(value) => Ok(Literal::Float(value).into()),
                    None => Err(WireError::IntegerOutOfRange(number.to_string())),
                }
            }
        }
        JsonValue::String(value) => Ok(Literal::Str(value.clone()).into()),
        JsonValue::Object(object) => match object.get(keys::FAB_MARK) {
            Some(JsonValue::Object(info)) => decode_info(info, depth),
            Some(_) => Err(WireError::WrongKind {
                key: keys::FAB_MARK,
                expected: "an object",
            }),
            None => Err(WireError::NotANode("an object without a *fab key")),
        },
        JsonValue::Array(_) => Err(WireError::NotANode("an array")),
        JsonValue::Bool(_) => Err(WireError::NotANode("a boolean")),
        JsonValue::Null => Err(WireError::NotANode("null")),
    }
}

fn decode_info(info: &Map<String, JsonValue>, depth: usize) -> Result<Node, WireError> {
    let node = match get_str(info, keys::TYPE)? {
        tags::REFERENCE => Node::Reference(get_memo_id(info)?),
        tags::LIST => Node::List {
            memo_id: get_memo_id(info)?,
            items: get_item_list(info, depth + 1)?,
        },
        tags::TUPLE => Node::Tuple {
            memo_id: get_memo_id(info)?,
            items: get_item_list(info, depth + 1)?,
        },
        tags::DICT => Node::Dict {
            memo_id: get_memo_id(info)?,
            items: get_item_dict(info, depth + 1)?,
        },
        tags::TYPE => Node::Type(get_type_path(info)?),
        tags::CLASS_INSTANCE => Node::Instance {
            type_path: get_type_path(info)?,
            memo_id: get_memo_id(info)?,
            attributes: get_item_dict(info, depth + 1)?,
        },
        tags::FLOAT => {
            let value = match get_str(info, keys::STATE)? {
                "nan" => f64::NAN,
                "inf" => f64::INFINITY,
                "-inf" => f64::NEG_INFINITY,
                other => return Err(WireError::InvalidFloatState(other.to_string())),
            };
            Literal::Float(value).into()
        }
        other => return Err(WireError::UnknownTag(other.to_string())),
    };
    Ok(node)
}

fn get<'a>(info: &'a Map<String, JsonValue>, key: &'static str) -> Result<&'a JsonValue, WireError> {
    info.get(key).ok_or(WireError::MissingKey(key))
}

fn get_str<'a>(info: &'a Map<String, JsonValue>, key: &'static str) -> Result<&'a str, WireError> {
    get(info, key)?.as_str().ok_or(WireError::WrongKind {
        key,
        expected: "a string",
    })
}

fn get_memo_id(info: &Map<String, JsonValue>) -> Result<MemoId, WireError> {
    get(info, keys::MEMO_ID)?
        .as_u64()
        .and_then(|id| usize::try_from(id).ok())
        .map(MemoId)
        .ok_or(WireError::WrongKind {
            key: keys::MEMO_ID,
            expected: "a non-negative integer",
        })
}

fn get_type_path(info: &Map<String, JsonValue>) -> Result<TypePath, WireError> {
    Ok(TypePath::new(
        get_str(info, keys::MODULE)?,
        get_str(info, keys::CLASS)?,
    ))
}

fn get_item_list(info: &Map<String, JsonValue>, depth: usize) -> Result<Vec<Node>, WireError> {
    match get(info, keys::ITEM_LIST)? {
        JsonValue::Array(items) => items.iter().map(|item| decode(item, depth)).collect(),
        _ => Err(WireError::WrongKind {
            key: keys::ITEM_LIST,
            expected: "an array",
        }),
    }
}

fn get_item_dict(
    info: &Map<String, JsonValue>,
    depth: usize,
) -> Result<Vec<(Node, Node)>, WireError> {
    match get(info, keys::ITEM_DICT)? {
        JsonValue::Object(map) => map
            .iter()
            .map(|(name, value)| -> Result<(Node, Node), WireError> {
                Ok((Literal::Str(name.clone()).into(), decode(value, depth)?))
            })
            .collect(),
        JsonValue::Array(flat) => {
            let flat = flat
                .iter()
                .map(|item| decode(item, depth))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(into_pairs(flat)?)
        }
        _ => Err(WireError::WrongKind {
            key: keys::ITEM_DICT,
            expected: "an object or an array",
        }),
    }
}

pub fn from_str(text: &str) -> Result<Node, WireError> {
    let json: JsonValue = serde_json::from_str(text)?;
    from_json(&json)
}
