//! Simple-type facet checking: the constraints XSD and DTD attribute
//! declarations can place on a scalar value (enumeration, pattern, length,
//! numeric bounds, fixed value).

use crate::errors::{Error, Result};

/// A single constraint on a lexical value. `SimpleType::check` ANDs every
/// facet together; `Facet::Pattern` entries within one type are OR-combined
/// (an XSD type lists one or more `xs:pattern` facets, any one of which may
/// match), matching the XSD facet-combination rules.
#[derive(Clone, Debug)]
pub enum Facet {
    Enumeration(Vec<String>),
    /// An `xs:pattern` facet. The XSD regex dialect is implicitly
    /// whole-string anchored (a pattern matches iff it matches the entire
    /// lexical value), so the pattern is compiled with `^(?:...)$` wrapped
    /// around the source text.
    Pattern(regex::Regex),
    Length(usize),
    MinLength(usize),
    MaxLength(usize),
    MinInclusive(f64),
    MaxInclusive(f64),
    MinExclusive(f64),
    MaxExclusive(f64),
    /// The value must equal exactly this string (`#FIXED` in DTD, or an
    /// XSD attribute with `fixed="..."`).
    FixedValue(String),
}

/// A named simple type: a base primitive plus zero or more facets.
#[derive(Clone, Debug, Default)]
pub struct SimpleType {
    pub facets: Vec<Facet>,
    /// Overrides the built-in numeric/date parsing for a primitive type
    /// (e.g. `xs:date`); returns `Ok(())` if `value` lexically satisfies
    /// the primitive, independent of the facets above.
    pub custom_validator: Option<fn(&str) -> Result<()>>,
}

impl SimpleType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_facet(mut self, facet: Facet) -> Self {
        self.facets.push(facet);
        self
    }

    /// Checks `value` (already whitespace-normalized per the attribute's
    /// `xs:whiteSpace` facet, which is applied by the caller before this
    /// is reached) against every facet.
    pub fn check(&self, value: &str) -> Result<()> {
        if let Some(validator) = self.custom_validator {
            validator(value)?;
        }

        let patterns: Vec<&regex::Regex> = self
            .facets
            .iter()
            .filter_map(|f| match f {
                Facet::Pattern(re) => Some(re),
                _ => None,
            })
            .collect();
        if !patterns.is_empty() && !patterns.iter().any(|re| re.is_match(value)) {
            return Err(Error::FacetViolation {
                value: value.to_string(),
                message: "value does not match any declared pattern".to_string(),
            });
        }

        for facet in &self.facets {
            match facet {
                Facet::Pattern(_) => {} // handled above, OR-combined
                Facet::Enumeration(values) => {
                    if !values.iter().any(|v| v == value) {
                        return Err(Error::FacetViolation {
                            value: value.to_string(),
                            message: "value is not one of the declared enumeration members".to_string(),
                        });
                    }
                }
                Facet::Length(n) => {
                    if value.chars().count() != *n {
                        return Err(Error::FacetViolation {
                            value: value.to_string(),
                            message: format!("length must be exactly {}", n),
                        });
                    }
                }
                Facet::MinLength(n) => {
                    if value.chars().count() < *n {
                        return Err(Error::FacetViolation {
                            value: value.to_string(),
                            message: format!("length must be at least {}", n),
                        });
                    }
                }
                Facet::MaxLength(n) => {
                    if value.chars().count() > *n {
                        return Err(Error::FacetViolation {
                            value: value.to_string(),
                            message: format!("length must be at most {}", n),
                        });
                    }
                }
                Facet::MinInclusive(bound) => check_numeric(value, |v| v >= *bound, "minInclusive")?,
                Facet::MaxInclusive(bound) => check_numeric(value, |v| v <= *bound, "maxInclusive")?,
                Facet::MinExclusive(bound) => check_numeric(value, |v| v > *bound, "minExclusive")?,
                Facet::MaxExclusive(bound) => check_numeric(value, |v| v < *bound, "maxExclusive")?,
                Facet::FixedValue(fixed) => {
                    if fixed != value {
                        return Err(Error::FixedValueMismatch {
                            attribute: String::new(),
                            expected: fixed.clone(),
                            found: value.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Compiles an `xs:pattern` facet's source text into a whole-string-anchored
/// [`regex::Regex`]. Called by the XSD/DTD back-ends while building a
/// [`SimpleType`]; a malformed pattern is a grammar error, not a validation
/// error, since it is a defect in the schema rather than the instance.
pub fn compile_pattern(source: &str) -> Result<regex::Regex> {
    regex::Regex::new(&format!("^(?:{})$", source))
        .map_err(|e| Error::MalformedGrammar(format!("invalid xs:pattern {:?}: {}", source, e)))
}

fn check_numeric(value: &str, ok: impl Fn(f64) -> bool, facet_name: &str) -> Result<()> {
    let parsed: f64 = value.trim().parse().map_err(|_| Error::FacetViolation {
        value: value.to_string(),
        message: format!("value is not numeric, required by {} facet", facet_name),
    })?;
    if ok(parsed) {
        Ok(())
    } else {
        Err(Error::FacetViolation {
            value: value.to_string(),
            message: format!("value violates {} facet", facet_name),
        })
    }
}

/// Collapses runs of XML whitespace to a single space and trims the ends,
/// implementing `xs:whiteSpace="collapse"`. `xs:whiteSpace="replace"`
/// (newline/tab become space, no collapsing) and `"preserve"` are the
/// caller's responsibility since they depend on which facet is declared.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_accepts_only_listed_values() {
        let t = SimpleType::new().with_facet(Facet::Enumeration(vec!["red".into(), "blue".into()]));
        assert!(t.check("red").is_ok());
        assert!(t.check("green").is_err());
    }

    #[test]
    fn length_facets_bound_character_count() {
        let t = SimpleType::new().with_facet(Facet::MinLength(2)).with_facet(Facet::MaxLength(4));
        assert!(t.check("ab").is_ok());
        assert!(t.check("a").is_err());
        assert!(t.check("abcde").is_err());
    }

    #[test]
    fn numeric_bounds_reject_out_of_range_values() {
        let t = SimpleType::new().with_facet(Facet::MinInclusive(0.0)).with_facet(Facet::MaxInclusive(100.0));
        assert!(t.check("50").is_ok());
        assert!(t.check("150").is_err());
        assert!(t.check("not-a-number").is_err());
    }

    #[test]
    fn fixed_value_requires_exact_match() {
        let t = SimpleType::new().with_facet(Facet::FixedValue("1.0".into()));
        assert!(t.check("1.0").is_ok());
        let err = t.check("2.0").unwrap_err();
        assert!(matches!(err, Error::FixedValueMismatch { .. }));
    }

    #[test]
    fn collapse_whitespace_joins_runs_into_single_spaces() {
        assert_eq!(collapse_whitespace("  a   b\tc\n"), "a b c");
    }

    #[test]
    fn pattern_facet_is_whole_string_anchored() {
        let t = SimpleType::new().with_facet(Facet::Pattern(compile_pattern(r"[0-9]{3}-[0-9]{4}").unwrap()));
        assert!(t.check("555-1234").is_ok());
        assert!(t.check("x555-1234").is_err());
        assert!(t.check("555-1234x").is_err());
    }

    #[test]
    fn multiple_pattern_facets_are_or_combined() {
        let t = SimpleType::new()
            .with_facet(Facet::Pattern(compile_pattern("red").unwrap()))
            .with_facet(Facet::Pattern(compile_pattern("blue").unwrap()));
        assert!(t.check("red").is_ok());
        assert!(t.check("blue").is_ok());
        assert!(t.check("green").is_err());
    }
}
