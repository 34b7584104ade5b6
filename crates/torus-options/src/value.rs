//! The tagged option value and its coercion table.
//!
//! [`OptionValue`] is a closed sum type: a value is unset or holds exactly
//! one of bool, integer, real, text, or an opaque payload. Cross-tag reads
//! go through an explicit, total coercion table; there is no reflection and
//! no implicit widening beyond what the table states.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Tolerance for real-to-integer coercion: the real must be within this
/// distance of its nearest integer for the conversion to succeed.
const INT_TOLERANCE: f64 = 1e-3;

/// An opaque payload carried through the tree without coercion.
///
/// Used for structured values (numeric arrays, fields) that the tree stores
/// and hands back but never interprets. Retrieval requires an exact type
/// match via downcast. Single-threaded by design, hence `Rc`.
#[derive(Clone)]
pub struct OpaqueValue {
    payload: Rc<dyn Any>,
    type_name: &'static str,
}

impl OpaqueValue {
    /// Wrap a value for opaque storage.
    pub fn new<T: 'static>(value: T) -> Self {
        OpaqueValue {
            payload: Rc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Recover the payload if it holds exactly `T`.
    pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.payload).downcast::<T>().ok()
    }

    /// Name of the stored payload type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueValue<{}>", self.type_name)
    }
}

impl PartialEq for OpaqueValue {
    /// Opaque payloads compare by identity: equal only if they share storage.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.payload, &other.payload)
    }
}

/// A dynamically-typed option value. Exactly one tag is active.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OptionValue {
    /// No value stored
    #[default]
    Unset,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Real (double precision)
    Real(f64),
    /// Text
    Text(String),
    /// Opaque payload, retrievable only by exact type
    Opaque(OpaqueValue),
}

impl OptionValue {
    /// Name of the active tag, for diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            OptionValue::Unset => "unset",
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "int",
            OptionValue::Real(_) => "real",
            OptionValue::Text(_) => "text",
            OptionValue::Opaque(_) => "opaque",
        }
    }

    /// True if no value is stored.
    pub fn is_unset(&self) -> bool {
        matches!(self, OptionValue::Unset)
    }

    /// Coerce to bool.
    ///
    /// Text is decided by its first character, case-insensitive: `y`, `t`,
    /// `1` are true; `n`, `f`, `0` are false. Any other leading character
    /// fails. Whole phrases such as `"yes_this_is_a_bool"` therefore read
    /// as true.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Text(s) => match s.chars().next()?.to_ascii_lowercase() {
                'y' | 't' | '1' => Some(true),
                'n' | 'f' | '0' => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Coerce to integer.
    ///
    /// Reals succeed only when within `INT_TOLERANCE` of their nearest
    /// integer; text is parsed.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            OptionValue::Real(r) => {
                let rounded = r.round();
                if (r - rounded).abs() <= INT_TOLERANCE {
                    Some(rounded as i64)
                } else {
                    None
                }
            }
            OptionValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to real. Integers widen; text is parsed.
    pub fn to_real(&self) -> Option<f64> {
        match self {
            OptionValue::Real(r) => Some(*r),
            OptionValue::Int(i) => Some(*i as f64),
            OptionValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Canonical textual rendering of the stored tag. Fails only for Unset.
    pub fn to_text(&self) -> Option<String> {
        match self {
            OptionValue::Unset => None,
            other => Some(other.to_string()),
        }
    }

    /// Equality against a literal, coercing the literal to the stored tag.
    ///
    /// An impossible coercion compares unequal. Unset compares unequal to
    /// everything.
    pub fn coerced_eq(&self, literal: &OptionValue) -> bool {
        match self {
            OptionValue::Unset => false,
            OptionValue::Bool(b) => literal.to_bool() == Some(*b),
            OptionValue::Int(i) => literal.to_int() == Some(*i),
            OptionValue::Real(r) => literal.to_real() == Some(*r),
            OptionValue::Text(t) => literal.to_text().as_deref() == Some(t.as_str()),
            OptionValue::Opaque(o) => match literal {
                OptionValue::Opaque(other) => o == other,
                _ => false,
            },
        }
    }

    /// Ordering against a literal, coercing the literal to the stored tag.
    /// Returns `None` when the coercion fails or the tag has no order.
    pub fn coerced_cmp(&self, literal: &OptionValue) -> Option<Ordering> {
        match self {
            OptionValue::Bool(b) => literal.to_bool().map(|other| b.cmp(&other)),
            OptionValue::Int(i) => literal.to_int().map(|other| i.cmp(&other)),
            OptionValue::Real(r) => literal.to_real().and_then(|other| r.partial_cmp(&other)),
            OptionValue::Text(t) => literal.to_text().map(|other| t.as_str().cmp(other.as_str())),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Unset => Ok(()),
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Real(r) => write!(f, "{}", r),
            OptionValue::Text(s) => write!(f, "{}", s),
            OptionValue::Opaque(_) => write!(f, "<opaque>"),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int(i64::from(value))
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Real(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<OpaqueValue> for OptionValue {
    fn from(value: OpaqueValue) -> Self {
        OptionValue::Opaque(value)
    }
}

/// A scalar type readable from and writable to an [`OptionValue`].
///
/// This trait backs the generic `get`/`with_default`/`set` surface of the
/// tree. The coercion rules are exactly those of the `to_*` methods.
pub trait OptionScalar: Clone {
    /// Target type name used in conversion errors.
    const TYPE_NAME: &'static str;

    /// Convert into a stored value.
    fn into_value(self) -> OptionValue;

    /// Read out of a stored value, applying the coercion table.
    fn from_value(value: &OptionValue) -> Option<Self>;
}

impl OptionScalar for bool {
    const TYPE_NAME: &'static str = "bool";

    fn into_value(self) -> OptionValue {
        OptionValue::Bool(self)
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        value.to_bool()
    }
}

impl OptionScalar for i64 {
    const TYPE_NAME: &'static str = "int";

    fn into_value(self) -> OptionValue {
        OptionValue::Int(self)
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        value.to_int()
    }
}

impl OptionScalar for i32 {
    const TYPE_NAME: &'static str = "int";

    fn into_value(self) -> OptionValue {
        OptionValue::Int(i64::from(self))
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        value.to_int().and_then(|wide| i32::try_from(wide).ok())
    }
}

impl OptionScalar for f64 {
    const TYPE_NAME: &'static str = "real";

    fn into_value(self) -> OptionValue {
        OptionValue::Real(self)
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        value.to_real()
    }
}

impl OptionScalar for String {
    const TYPE_NAME: &'static str = "text";

    fn into_value(self) -> OptionValue {
        OptionValue::Text(self)
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        value.to_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unset() {
        assert!(OptionValue::default().is_unset());
        assert_eq!(OptionValue::default().tag(), "unset");
    }

    #[test]
    fn test_int_from_near_integral_real() {
        assert_eq!(OptionValue::Real(42.00001).to_int(), Some(42));
        assert_eq!(OptionValue::Real(-42.00001).to_int(), Some(-42));
    }

    #[test]
    fn test_int_from_non_integral_real_fails() {
        assert_eq!(OptionValue::Real(12.5).to_int(), None);
    }

    #[test]
    fn test_real_round_trip_is_exact() {
        let value = OptionValue::Real(0.7853981633974483);
        assert_eq!(value.to_real(), Some(0.7853981633974483));
    }

    #[test]
    fn test_bool_from_text_first_character() {
        assert_eq!(OptionValue::from("true").to_bool(), Some(true));
        assert_eq!(OptionValue::from("Yes").to_bool(), Some(true));
        assert_eq!(OptionValue::from("1").to_bool(), Some(true));
        assert_eq!(OptionValue::from("no").to_bool(), Some(false));
        assert_eq!(OptionValue::from("False").to_bool(), Some(false));
        assert_eq!(OptionValue::from("0").to_bool(), Some(false));
    }

    #[test]
    fn test_bool_from_truthy_phrase() {
        assert_eq!(
            OptionValue::from("yes_this_is_a_bool").to_bool(),
            Some(true)
        );
    }

    #[test]
    fn test_bool_from_ambiguous_text_fails() {
        let value = OptionValue::from("A_bool_starts_with_T_or_N_or_Y_or_F_or_1_or_0");
        assert_eq!(value.to_bool(), None);
        assert_eq!(OptionValue::from("").to_bool(), None);
    }

    #[test]
    fn test_numbers_parse_from_text() {
        assert_eq!(OptionValue::from("42").to_int(), Some(42));
        assert_eq!(OptionValue::from(" -7 ").to_int(), Some(-7));
        assert_eq!(OptionValue::from("2.5").to_real(), Some(2.5));
        assert_eq!(OptionValue::from("nonsense").to_int(), None);
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(OptionValue::Bool(true).to_text().as_deref(), Some("true"));
        assert_eq!(OptionValue::Int(42).to_text().as_deref(), Some("42"));
        assert_eq!(OptionValue::Real(12.5).to_text().as_deref(), Some("12.5"));
        assert_eq!(OptionValue::from("abc").to_text().as_deref(), Some("abc"));
        assert_eq!(OptionValue::Unset.to_text(), None);
    }

    #[test]
    fn test_opaque_round_trip() {
        let value = OptionValue::Opaque(OpaqueValue::new(vec![1.0, 2.0, 3.0]));
        let OptionValue::Opaque(opaque) = &value else {
            panic!("expected opaque");
        };
        let payload = opaque.downcast::<Vec<f64>>().unwrap();
        assert_eq!(payload.as_slice(), &[1.0, 2.0, 3.0]);
        // Wrong type fails the downcast
        assert!(opaque.downcast::<String>().is_none());
        // No coercion out of opaque
        assert_eq!(value.to_int(), None);
        assert_eq!(value.to_text().as_deref(), Some("<opaque>"));
    }

    #[test]
    fn test_coerced_equality() {
        assert!(OptionValue::Int(3).coerced_eq(&OptionValue::Int(3)));
        assert!(!OptionValue::Int(3).coerced_eq(&OptionValue::Int(4)));
        // Literal coerces to the stored tag
        assert!(OptionValue::Int(3).coerced_eq(&OptionValue::Real(3.0)));
        assert!(OptionValue::from("3").coerced_eq(&OptionValue::Int(3)));
        assert!(!OptionValue::Unset.coerced_eq(&OptionValue::Int(3)));
    }

    #[test]
    fn test_coerced_ordering() {
        assert_eq!(
            OptionValue::Int(3).coerced_cmp(&OptionValue::Int(4)),
            Some(Ordering::Less)
        );
        assert_eq!(
            OptionValue::from("bbb").coerced_cmp(&OptionValue::from("aaa")),
            Some(Ordering::Greater)
        );
        assert_eq!(OptionValue::Unset.coerced_cmp(&OptionValue::Int(4)), None);
    }
}
