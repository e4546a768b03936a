/// Column-aware row sorting for the list views

use std::cmp::Ordering;

/// How the cells of a column compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    /// A number followed by a one-character unit, e.g. `12.5%`
    UnitSuffixed,
}

/// PID, Command, CPU, Memory, Status, Parent, Start Time, Run Time
pub const PROCESS_COLUMNS: &[ColumnKind] = &[
    ColumnKind::Integer,
    ColumnKind::Text,
    ColumnKind::UnitSuffixed,
    ColumnKind::UnitSuffixed,
    ColumnKind::Text,
    ColumnKind::Integer,
    ColumnKind::Text,
    ColumnKind::Integer,
];

/// ID, Image, Name, Status, State, CPU, Memory, Net I/O, Block I/O
pub const CONTAINER_COLUMNS: &[ColumnKind] = &[
    ColumnKind::Text,
    ColumnKind::Text,
    ColumnKind::Text,
    ColumnKind::Text,
    ColumnKind::Text,
    ColumnKind::UnitSuffixed,
    ColumnKind::UnitSuffixed,
    ColumnKind::Text,
    ColumnKind::Text,
];

fn parse_integer(cell: &str) -> i64 {
    cell.trim().parse().unwrap_or(0)
}

fn parse_suffixed(cell: &str) -> f64 {
    let cell = cell.trim();
    let mut chars = cell.chars();
    chars.next_back();
    chars.as_str().trim().parse().unwrap_or(0.0)
}

/// Compare two cells of a column of the given kind. Unparseable numbers count as zero.
pub fn compare_cells(a: &str, b: &str, kind: ColumnKind) -> Ordering {
    match kind {
        ColumnKind::Integer => parse_integer(a).cmp(&parse_integer(b)),
        ColumnKind::Text => a.cmp(b),
        ColumnKind::UnitSuffixed => parse_suffixed(a).total_cmp(&parse_suffixed(b)),
    }
}

/// Reorder `rows` by `column`. Columns without a declared kind compare as text;
/// rows too short to have the column sort first.
pub fn sort_rows(rows: &mut [Vec<String>], column: usize, ascending: bool, kinds: &[ColumnKind]) {
    let kind = kinds.get(column).copied().unwrap_or(ColumnKind::Text);
    rows.sort_by(|a, b| {
        let ordering = match (a.get(column), b.get(column)) {
            (Some(a), Some(b)) => compare_cells(a, b, kind),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_percent_column_ascending() {
        let mut data = rows(&[&["a", "5%"], &["b", "20%"], &["c", "1%"]]);
        sort_rows(&mut data, 1, true, &[ColumnKind::Text, ColumnKind::UnitSuffixed]);
        assert_eq!(data, rows(&[&["c", "1%"], &["a", "5%"], &["b", "20%"]]));
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut data = rows(&[&["3", "x"], &["10", "y"], &["2", "z"]]);
        sort_rows(&mut data, 0, true, PROCESS_COLUMNS);
        let once = data.clone();
        sort_rows(&mut data, 0, true, PROCESS_COLUMNS);
        assert_eq!(data, once);
        assert_eq!(data[0][0], "2");
        assert_eq!(data[2][0], "10");
    }

    #[test]
    fn test_descending_reverses_ascending() {
        let mut asc = rows(&[&["b"], &["d"], &["a"], &["c"]]);
        let mut desc = asc.clone();
        sort_rows(&mut asc, 0, true, &[ColumnKind::Text]);
        sort_rows(&mut desc, 0, false, &[ColumnKind::Text]);
        asc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn test_integer_column_is_numeric_not_lexicographic() {
        let mut data = rows(&[&["100"], &["9"], &["-"]]);
        sort_rows(&mut data, 0, true, &[ColumnKind::Integer]);
        assert_eq!(data, rows(&[&["-"], &["9"], &["100"]]));
    }

    #[test]
    fn test_unknown_column_kind_falls_back_to_text() {
        let mut data = rows(&[&["x", "beta"], &["y", "alpha"]]);
        sort_rows(&mut data, 1, true, &[ColumnKind::Text]);
        assert_eq!(data[0][1], "alpha");
    }

    #[test]
    fn test_suffix_parse() {
        assert_eq!(parse_suffixed("12.5%"), 12.5);
        assert_eq!(parse_suffixed("NA"), 0.0);
        assert_eq!(parse_suffixed(""), 0.0);
    }
}
