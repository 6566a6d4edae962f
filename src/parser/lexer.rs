// Token parsers shared by the filter grammar

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, opt, recognize, value},
    sequence::{delimited, pair, tuple},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace.
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Column name. Dataset headers use `/` and `_` besides alphanumerics.
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '/'),
        |s: &str| s.to_string(),
    )(input)
}

/// Signed decimal without exponent, so `6..9` splits cleanly.
pub fn number_literal(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

/// Double-quoted string with `\"` and `\\` escapes.
pub fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        value(String::new(), tag_empty_string),
        delimited(
            char('"'),
            escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", char('\\')), value("\"", char('"')))),
            ),
            char('"'),
        ),
    ))(input)
}

fn tag_empty_string(input: &str) -> IResult<&str, &str> {
    nom::bytes::complete::tag("\"\"")(input)
}

/// Unquoted option value: anything up to the next comma.
pub fn bare_word(input: &str) -> IResult<&str, String> {
    map(is_not(","), |s: &str| s.trim().to_string())(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("Workshops/Certifications=1"), Ok(("=1", "Workshops/Certifications".to_string())));
        assert!(identifier("=1").is_err());
    }

    #[test]
    fn test_number_literal() {
        assert_eq!(number_literal("6..9"), Ok(("..9", 6.0)));
        assert_eq!(number_literal("-2.5"), Ok(("", -2.5)));
        assert!(number_literal("abc").is_err());
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal(r#""Not Placed""#), Ok(("", "Not Placed".to_string())));
        assert_eq!(string_literal(r#""a\"b""#), Ok(("", "a\"b".to_string())));
        assert_eq!(string_literal(r#""""#), Ok(("", String::new())));
    }

    #[test]
    fn test_ws() {
        let mut parser = ws(identifier);
        assert_eq!(parser("  CGPA  ="), Ok(("=", "CGPA".to_string())));
    }
}
