use std::fmt::{self, Display};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ProbeResult;

/// A composable condition over a [`ProbeResult`], used to decide whether a
/// probe succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResultFilter {
    /// The response status code equals the value.
    Code(u16),
    /// The response body contains the value.
    BodyContains(String),
    /// Every member is true. No members is true.
    All(Vec<ResultFilter>),
    /// At least one member is true. No members is false.
    Any(Vec<ResultFilter>),
    /// The member is false. Wrap an `All`/`Any` to negate several conditions.
    Not(Box<ResultFilter>),
}

impl ResultFilter {
    pub fn code(code: u16) -> Self {
        Self::Code(code)
    }

    pub fn body_contains(s: impl Into<String>) -> Self {
        Self::BodyContains(s.into())
    }

    pub fn all(members: impl IntoIterator<Item = ResultFilter>) -> Self {
        Self::All(members.into_iter().collect())
    }

    pub fn any(members: impl IntoIterator<Item = ResultFilter>) -> Self {
        Self::Any(members.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(member: ResultFilter) -> Self {
        Self::Not(Box::new(member))
    }

    pub fn check(&self, res: &ProbeResult) -> bool {
        match self {
            Self::Code(code) => res.code == *code,
            Self::BodyContains(s) => res.body.contains(s.as_str()),
            Self::All(members) => members.iter().all(|m| m.check(res)),
            Self::Any(members) => members.iter().any(|m| m.check(res)),
            Self::Not(member) => !member.check(res),
        }
    }
}

fn fmt_members(f: &mut fmt::Formatter<'_>, name: &str, members: &[ResultFilter]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, m) in members.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", m)?;
    }
    write!(f, ")")
}

impl Display for ResultFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "code == {}", code),
            Self::BodyContains(s) => write!(f, "body contains {:?}", s),
            Self::All(members) => fmt_members(f, "all", members),
            Self::Any(members) => fmt_members(f, "any", members),
            Self::Not(member) => write!(f, "not({})", member),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProbeId;

    const POTATO: &str = "This is a body containing potato";

    fn result(code: u16, body: &str) -> ProbeResult {
        ProbeResult::new(ProbeId::default(), "http://localhost")
            .with_code(code)
            .with_body(body)
    }

    #[test]
    fn test_filter_code() {
        let cases = [
            (200, ResultFilter::all([ResultFilter::code(200)]), true),
            (404, ResultFilter::all([ResultFilter::code(200)]), false),
            (
                200,
                ResultFilter::all([ResultFilter::code(200), ResultFilter::code(404)]),
                false,
            ),
            (
                200,
                ResultFilter::any([ResultFilter::code(200), ResultFilter::code(404)]),
                true,
            ),
            (200, ResultFilter::not(ResultFilter::code(200)), false),
            (404, ResultFilter::not(ResultFilter::code(200)), true),
            (
                200,
                ResultFilter::not(ResultFilter::all([ResultFilter::code(200)])),
                false,
            ),
            (
                404,
                ResultFilter::not(ResultFilter::all([ResultFilter::code(200)])),
                true,
            ),
            (
                200,
                ResultFilter::not(ResultFilter::all([
                    ResultFilter::code(200),
                    ResultFilter::code(404),
                ])),
                true,
            ),
            (
                200,
                ResultFilter::not(ResultFilter::any([
                    ResultFilter::code(200),
                    ResultFilter::code(404),
                ])),
                false,
            ),
            (
                200,
                ResultFilter::not(ResultFilter::not(ResultFilter::code(200))),
                true,
            ),
            (
                404,
                ResultFilter::not(ResultFilter::not(ResultFilter::code(200))),
                false,
            ),
        ];

        for (code, filter, expect) in cases {
            assert_eq!(
                filter.check(&result(code, "")),
                expect,
                "code {} against {}",
                code,
                filter
            );
        }
    }

    #[test]
    fn test_filter_body() {
        let potato = || ResultFilter::body_contains("potato");
        let tomato = || ResultFilter::body_contains("tomato");

        let cases = [
            (200, ResultFilter::all([potato()]), true),
            (404, ResultFilter::all([potato()]), true),
            (200, ResultFilter::all([potato(), tomato()]), false),
            (200, ResultFilter::any([potato(), tomato()]), true),
            (200, ResultFilter::not(potato()), false),
            (404, ResultFilter::not(potato()), false),
            (404, ResultFilter::not(ResultFilter::all([potato()])), false),
            (
                200,
                ResultFilter::not(ResultFilter::all([potato(), tomato()])),
                true,
            ),
            (
                200,
                ResultFilter::not(ResultFilter::any([potato(), tomato()])),
                false,
            ),
            (404, ResultFilter::not(ResultFilter::not(potato())), true),
        ];

        for (code, filter, expect) in cases {
            assert_eq!(
                filter.check(&result(code, POTATO)),
                expect,
                "code {} against {}",
                code,
                filter
            );
        }

        assert!(!ResultFilter::body_contains("Potato").check(&result(200, POTATO)));
    }

    #[test]
    fn test_filter_empty_groups() {
        let r = result(200, "");
        assert!(ResultFilter::All(vec![]).check(&r));
        assert!(!ResultFilter::Any(vec![]).check(&r));
        assert!(!ResultFilter::not(ResultFilter::All(vec![])).check(&r));
    }

    #[test]
    fn test_filter_display() {
        let f = ResultFilter::all([
            ResultFilter::code(200),
            ResultFilter::not(ResultFilter::any([
                ResultFilter::body_contains("error"),
                ResultFilter::code(500),
            ])),
        ]);
        assert_eq!(
            f.to_string(),
            r#"all(code == 200, not(any(body contains "error", code == 500)))"#
        );
    }

    #[test]
    fn test_filter_deserialize() {
        let json = r#"{"all": [{"code": 200}, {"not": {"body_contains": "error"}}]}"#;
        let f: ResultFilter = serde_json::from_str(json).unwrap();
        assert_eq!(
            f,
            ResultFilter::all([
                ResultFilter::code(200),
                ResultFilter::not(ResultFilter::body_contains("error")),
            ])
        );
    }
}
