// Filter shorthand: `COL=LO..HI` for ranges, `COL=a,b,c` for option sets

use super::lexer::{bare_word, identifier, number_literal, string_literal, ws};
use crate::data::Cell;
use crate::error::{ExplorerError, Result};
use crate::predicate::{FilterSelection, RangeFilter};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{all_consuming, map},
    multi::separated_list0,
    sequence::{separated_pair, tuple},
    IResult,
};

/// One parsed `--filter` argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterArg {
    Range { column: String, min: f64, max: f64 },
    /// An empty option list selects nothing.
    Options { column: String, values: Vec<Cell> },
}

fn option_value(input: &str) -> IResult<&str, Cell> {
    alt((
        map(ws(string_literal), Cell::Text),
        map(bare_word, |s| Cell::parse(&s)),
    ))(input)
}

fn range_body(input: &str) -> IResult<&str, (f64, f64)> {
    separated_pair(ws(number_literal), tag(".."), ws(number_literal))(input)
}

/// Parse a single filter expression
/// Format: CGPA=6..9 | Internships=0,1 | PlacementStatus="Placed" | Projects=
pub fn parse_filter(input: &str) -> IResult<&str, FilterArg> {
    let (input, (column, _)) = tuple((ws(identifier), char('=')))(input)?;

    let range_column = column.clone();

    alt((
        map(all_consuming(range_body), move |(min, max)| FilterArg::Range {
            column: range_column.clone(),
            min,
            max,
        }),
        map(
            all_consuming(separated_list0(char(','), option_value)),
            move |values: Vec<Cell>| FilterArg::Options {
                column: column.clone(),
                values: values.into_iter().filter(|v| !v.is_null()).collect(),
            },
        ),
    ))(input)
}

/// Parse every `--filter` argument into a selection. Repeating a column keeps the last one.
pub fn parse_filters<S: AsRef<str>>(args: &[S]) -> Result<FilterSelection> {
    let mut selection = FilterSelection::default();

    for arg in args {
        let arg = arg.as_ref();
        let (_, filter) = parse_filter(arg)
            .map_err(|e| ExplorerError::InvalidRequest(format!("bad filter '{}': {:?}", arg, e)))?;

        match filter {
            FilterArg::Range { column, min, max } => {
                selection.discrete_filters.remove(&column);
                selection.continuous_filters.insert(column, RangeFilter::new(min, max));
            }
            FilterArg::Options { column, values } => {
                selection.continuous_filters.remove(&column);
                selection
                    .discrete_filters
                    .insert(column, values.iter().map(Cell::to_json).collect());
            }
        }
    }

    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let (_, filter) = parse_filter("CGPA=6..9").unwrap();
        assert_eq!(filter, FilterArg::Range { column: "CGPA".to_string(), min: 6.0, max: 9.0 });

        let (_, filter) = parse_filter(" SoftSkillsRating = 3.5 .. 4.8 ").unwrap();
        assert_eq!(
            filter,
            FilterArg::Range { column: "SoftSkillsRating".to_string(), min: 3.5, max: 4.8 }
        );
    }

    #[test]
    fn test_parse_crossed_range_kept() {
        let arg = String::from("CGPA=9..6");
        let (rest, filter) = parse_filter(&arg).unwrap();
        assert!(rest.is_empty());
        assert_eq!(filter, FilterArg::Range { column: "CGPA".to_string(), min: 9.0, max: 6.0 });
    }

    #[test]
    fn test_parse_options() {
        let (_, filter) = parse_filter("Internships=0,1").unwrap();
        assert_eq!(
            filter,
            FilterArg::Options {
                column: "Internships".to_string(),
                values: vec![Cell::Number(0.0), Cell::Number(1.0)],
            }
        );

        let (_, filter) = parse_filter(r#"PlacementStatus="Placed", NotPlaced"#).unwrap();
        assert_eq!(
            filter,
            FilterArg::Options {
                column: "PlacementStatus".to_string(),
                values: vec![Cell::Text("Placed".to_string()), Cell::Text("NotPlaced".to_string())],
            }
        );
    }

    #[test]
    fn test_parse_empty_options() {
        let (_, filter) = parse_filter("Internships=").unwrap();
        assert_eq!(filter, FilterArg::Options { column: "Internships".to_string(), values: vec![] });
    }

    #[test]
    fn test_parse_filter_missing_equals() {
        assert!(parse_filter("CGPA 6..9").is_err());
        assert!(parse_filter("=6..9").is_err());
    }

    #[test]
    fn test_parse_filters_into_selection() {
        let selection = parse_filters(&["CGPA=6..9", "Internships=", "Projects=1,2"]).unwrap();
        assert_eq!(selection.continuous_filters["CGPA"], RangeFilter::new(6.0, 9.0));
        assert!(selection.discrete_filters["Internships"].is_empty());
        assert_eq!(selection.discrete_filters["Projects"].len(), 2);
    }

    #[test]
    fn test_last_filter_wins() {
        let selection = parse_filters(&["CGPA=6..9", "CGPA=7,8"]).unwrap();
        assert!(selection.continuous_filters.is_empty());
        assert_eq!(selection.discrete_filters["CGPA"].len(), 2);
    }
}
