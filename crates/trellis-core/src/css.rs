#![forbid(unsafe_code)]

//! CSS property short names and rule formatting for generated classes.
//!
//! Generated class names have the shape `{prefix}{short}-{n}`: `short` is the
//! abbreviation of the CSS property from [`short_name`], and `n` is a counter
//! allocated once per distinct `(short, value)` pair. Nodes that share a
//! computed style therefore share one class and one rule.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Abbreviation used in generated class names. Unmapped properties use
/// their full name.
#[must_use]
pub fn short_name(property: &str) -> &str {
    match property {
        "align-items" => "ali",
        "align-self" => "as",
        "background-color" => "bgc",
        "background-image" => "bgi",
        "background-position" => "bgp",
        "background-repeat" => "bgr",
        "background-size" => "bgs",
        "border-bottom-color" => "bbc",
        "border-bottom-left-radius" => "bblr",
        "border-bottom-right-radius" => "bbrr",
        "border-bottom-style" => "bbs",
        "border-bottom-width" => "bbw",
        "border-color" => "bc",
        "border-left-color" => "blc",
        "border-left-style" => "bls",
        "border-left-width" => "blw",
        "border-radius" => "br",
        "border-right-color" => "brc",
        "border-right-style" => "brs",
        "border-right-width" => "brw",
        "border-style" => "bs",
        "border-top-color" => "btc",
        "border-top-left-radius" => "btlr",
        "border-top-right-radius" => "btrr",
        "border-top-style" => "bts",
        "border-top-width" => "btw",
        "border-width" => "bw",
        "bottom" => "b",
        "color" => "c",
        "shadow" => "sh",
        "box-shadow" => "bxs",
        "text-shadow" => "tsh",
        "cursor" => "cur",
        "display" => "d",
        "flex-wrap" => "fw",
        "font-style" => "fst",
        "font-weight" => "fwt",
        "gap" => "g",
        "height" => "h",
        "justify-content" => "jc",
        "left" => "l",
        "link" => "lk",
        "link-color" => "lkc",
        "margin" => "m",
        "margin-bottom" => "mb",
        "margin-horizontal" => "mh",
        "margin-left" => "ml",
        "margin-right" => "mr",
        "margin-top" => "mt",
        "margin-vertical" => "mv",
        "max-height" => "mxh",
        "max-width" => "mxw",
        "min-height" => "mnh",
        "min-width" => "mnw",
        "opacity" => "op",
        "overflow" => "o",
        "overflow-x" => "ox",
        "overflow-y" => "oy",
        "padding" => "p",
        "padding-bottom" => "pb",
        "padding-horizontal" => "ph",
        "padding-left" => "pl",
        "padding-right" => "pr",
        "padding-top" => "pt",
        "padding-vertical" => "pv",
        "position" => "pos",
        "resize" => "res",
        "role" => "rl",
        "right" => "r",
        "sticky" => "s",
        "text-align" => "ta",
        "text-decoration" => "td",
        "text-transform" => "tt",
        "top" => "t",
        "width" => "w",
        "z-index" => "z",
        "-webkit-box-orient" => "wbo",
        "-webkit-line-clamp" => "wlc",
        "backdrop-filter" => "bdf",
        "mask-image" => "mi",
        "-webkit-mask-image" => "wmi",
        "mask-size" => "ms",
        "-webkit-mask-size" => "wms",
        "mask-repeat" => "mre",
        "-webkit-mask-repeat" => "wmre",
        "mask-position" => "mp",
        "-webkit-mask-position" => "wmp",
        "fetch-priority" => "ftp",
        other => other,
    }
}

/// A value attached to a generated class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CssValue {
    /// One value for the rule's own property.
    Single(String),
    /// Several declarations under one class (typography roles).
    Declarations(Vec<(String, String)>),
}

impl CssValue {
    /// Key used to deduplicate classes: equal values share a class.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            Self::Single(v) => format!("{v:?}"),
            Self::Declarations(decls) => {
                let mut key = String::from("{");
                for (prop, value) in decls {
                    let _ = write!(key, "{prop:?}:{value:?},");
                }
                key.push('}');
                key
            }
        }
    }
}

impl From<&str> for CssValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

impl From<String> for CssValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

/// Render one stylesheet rule. `color` declarations are `!important`.
#[must_use]
pub fn format_rule(selector: &str, property: &str, value: &CssValue) -> String {
    match value {
        CssValue::Single(v) => format!("{selector} {{ {property}: {v}{}; }}", important(property)),
        CssValue::Declarations(decls) => {
            let mut body = String::new();
            for (prop, v) in decls {
                let _ = write!(body, "{prop}: {v}{}; ", important(prop));
            }
            format!("{selector} {{ {body}}}")
        }
    }
}

fn important(property: &str) -> &'static str {
    if property == "color" { " !important" } else { "" }
}

/// Prefix shared by every class generated for `property`, including the
/// trailing dash: `__bgc-`.
#[must_use]
pub fn class_prefix(prefix: &str, property: &str) -> String {
    format!("{prefix}{}-", short_name(property))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_cover_common_properties() {
        assert_eq!(short_name("background-color"), "bgc");
        assert_eq!(short_name("color"), "c");
        assert_eq!(short_name("-webkit-line-clamp"), "wlc");
        assert_eq!(short_name("backdrop-filter"), "bdf");
        assert_eq!(short_name("object-fit"), "object-fit");
    }

    #[test]
    fn prefixes_do_not_collide() {
        // `__b-` (bottom) must not match `__bc-` (border-color) classes.
        let bottom = class_prefix("__", "bottom");
        assert!(!"__bc-1".starts_with(&bottom));
        assert!("__b-3".starts_with(&bottom));
    }

    #[test]
    fn single_rule_format() {
        let rule = format_rule(".__w-1", "width", &CssValue::from("100px"));
        assert_eq!(rule, ".__w-1 { width: 100px; }");
    }

    #[test]
    fn color_rules_are_important() {
        let rule = format_rule("body.dark .__c-2", "color", &CssValue::from("#000"));
        assert_eq!(rule, "body.dark .__c-2 { color: #000 !important; }");
    }

    #[test]
    fn declaration_rule_format() {
        let value = CssValue::Declarations(vec![
            ("font-size".into(), "14px".into()),
            ("line-height".into(), "20px".into()),
        ]);
        let rule = format_rule("body.mobile .__rl-2", "role", &value);
        assert_eq!(
            rule,
            "body.mobile .__rl-2 { font-size: 14px; line-height: 20px; }"
        );
    }

    #[test]
    fn cache_key_distinguishes_values() {
        let a = CssValue::from("1px");
        let b = CssValue::from("2px");
        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), CssValue::from("1px").cache_key());
    }
}
