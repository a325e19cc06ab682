use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use vams_core::{AppError, AppResult, NonEmptyString};

use crate::ResourceAttributes;

/// Matcher applied between a resource field and a criteria value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaOperator {
    /// Regex must match the whole field value.
    Equals,
    /// Regex must match somewhere in the field value.
    Contains,
    /// Regex must not match anywhere in the field value.
    DoesNotContain,
    /// Field value starts with the literal value.
    StartsWith,
    /// Field value ends with the literal value.
    EndsWith,
    /// Value is a member of the list-valued field.
    IsOneOf,
    /// Value is not a member of the list-valued field.
    IsNotOneOf,
}

impl CriteriaOperator {
    /// Returns a stable storage value for this operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::DoesNotContain => "does_not_contain",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::IsOneOf => "is_one_of",
            Self::IsNotOneOf => "is_not_one_of",
        }
    }
}

impl FromStr for CriteriaOperator {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "equals" => Ok(Self::Equals),
            "contains" => Ok(Self::Contains),
            "does_not_contain" => Ok(Self::DoesNotContain),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            "is_one_of" => Ok(Self::IsOneOf),
            "is_not_one_of" => Ok(Self::IsNotOneOf),
            _ => Err(AppError::Validation(format!(
                "unknown criteria operator '{value}'"
            ))),
        }
    }
}

/// One predicate tested against a resource attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CriteriaExpressionFields")]
pub struct CriteriaExpression {
    id: String,
    field: NonEmptyString,
    operator: CriteriaOperator,
    value: String,
    #[serde(skip_serializing)]
    matcher: Matcher,
}

#[derive(Deserialize)]
struct CriteriaExpressionFields {
    #[serde(default)]
    id: String,
    field: String,
    operator: CriteriaOperator,
    value: String,
}

impl TryFrom<CriteriaExpressionFields> for CriteriaExpression {
    type Error = AppError;

    fn try_from(fields: CriteriaExpressionFields) -> Result<Self, Self::Error> {
        Self::new(fields.id, fields.field, fields.operator, fields.value)
    }
}

impl PartialEq for CriteriaExpression {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.field == other.field
            && self.operator == other.operator
            && self.value == other.value
    }
}

impl Eq for CriteriaExpression {}

/// Operator-specific test prepared once when the expression is built.
#[derive(Debug, Clone)]
enum Matcher {
    Pattern(Regex),
    NotPattern(Regex),
    Prefix,
    Suffix,
    Member,
    NotMember,
}

impl Matcher {
    fn for_operator(operator: CriteriaOperator, value: &str) -> Result<Self, regex::Error> {
        Ok(match operator {
            CriteriaOperator::Equals => {
                // The bare value must parse on its own so it cannot escape the anchoring group.
                Regex::new(value)?;
                Self::Pattern(Regex::new(&format!("^(?:{value})$"))?)
            }
            CriteriaOperator::Contains => Self::Pattern(Regex::new(value)?),
            CriteriaOperator::DoesNotContain => Self::NotPattern(Regex::new(value)?),
            CriteriaOperator::StartsWith => Self::Prefix,
            CriteriaOperator::EndsWith => Self::Suffix,
            CriteriaOperator::IsOneOf => Self::Member,
            CriteriaOperator::IsNotOneOf => Self::NotMember,
        })
    }
}

impl CriteriaExpression {
    /// Creates a validated expression; regex operators require a compilable value.
    pub fn new(
        id: impl Into<String>,
        field: impl Into<String>,
        operator: CriteriaOperator,
        value: impl Into<String>,
    ) -> AppResult<Self> {
        let field = NonEmptyString::new(field)?;
        let value = value.into();
        let matcher = Matcher::for_operator(operator, value.as_str()).map_err(|error| {
            AppError::Validation(format!(
                "criteria value '{value}' for field '{field}' is not a valid pattern: {error}"
            ))
        })?;

        Ok(Self {
            id: id.into(),
            field,
            operator,
            value,
            matcher,
        })
    }

    /// Returns the expression identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the tested field name.
    #[must_use]
    pub fn field(&self) -> &str {
        self.field.as_str()
    }

    /// Returns the operator.
    #[must_use]
    pub fn operator(&self) -> CriteriaOperator {
        self.operator
    }

    /// Returns the operand.
    #[must_use]
    pub fn value(&self) -> &str {
        self.value.as_str()
    }

    /// Evaluates the expression against a resource.
    #[must_use]
    pub fn evaluate(&self, resource: &ResourceAttributes) -> bool {
        let field = self.field.as_str();
        let value = self.value.as_str();
        match &self.matcher {
            Matcher::Pattern(regex) => regex.is_match(&resource.text(field)),
            Matcher::NotPattern(regex) => !regex.is_match(&resource.text(field)),
            Matcher::Prefix => resource.text(field).starts_with(value),
            Matcher::Suffix => resource.text(field).ends_with(value),
            Matcher::Member => resource.list(field).contains(&value),
            Matcher::NotMember => !resource.list(field).contains(&value),
        }
    }
}

/// Combination mode of a constraint's expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criteria {
    /// Every expression must hold.
    #[serde(rename = "criteriaAnd")]
    And(Vec<CriteriaExpression>),
    /// At least one expression must hold.
    #[serde(rename = "criteriaOr")]
    Or(Vec<CriteriaExpression>),
}

impl Criteria {
    /// Builds criteria from the two optional lists of the catalog format.
    ///
    /// Exactly one list must be non-empty.
    pub fn from_lists(
        criteria_and: Vec<CriteriaExpression>,
        criteria_or: Vec<CriteriaExpression>,
    ) -> AppResult<Self> {
        match (criteria_and.is_empty(), criteria_or.is_empty()) {
            (false, true) => Ok(Self::And(criteria_and)),
            (true, false) => Ok(Self::Or(criteria_or)),
            (true, true) => Err(AppError::Validation(
                "constraint must include criteriaOr or criteriaAnd statements".to_owned(),
            )),
            (false, false) => Err(AppError::Validation(
                "constraint must not include both criteriaAnd and criteriaOr statements"
                    .to_owned(),
            )),
        }
    }

    /// Returns the expressions regardless of mode.
    #[must_use]
    pub fn expressions(&self) -> &[CriteriaExpression] {
        match self {
            Self::And(expressions) | Self::Or(expressions) => expressions.as_slice(),
        }
    }

    /// Returns the `(criteriaAnd, criteriaOr)` list pair of the storage format.
    #[must_use]
    pub fn as_lists(&self) -> (&[CriteriaExpression], &[CriteriaExpression]) {
        match self {
            Self::And(expressions) => (expressions.as_slice(), &[]),
            Self::Or(expressions) => (&[], expressions.as_slice()),
        }
    }

    /// Evaluates the combined expressions against a resource.
    #[must_use]
    pub fn evaluate(&self, resource: &ResourceAttributes) -> bool {
        match self {
            Self::And(expressions) => expressions
                .iter()
                .all(|expression| expression.evaluate(resource)),
            Self::Or(expressions) => expressions
                .iter()
                .any(|expression| expression.evaluate(resource)),
        }
    }
}
