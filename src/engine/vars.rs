/// Variable name cleaning
///
/// Names come from a free-form command line, so stray whitespace and commas
/// (`df1, df2`) are stripped before they become sub-path names.
use std::collections::BTreeSet;

/// Clean one variable name, removing surrounding whitespace and any commas
pub fn clean_var(var: &str) -> String {
    var.trim().replace(',', "")
}

/// Clean, de-duplicate and sort variable names
///
/// Names that are empty after cleaning (a lone `,`) are dropped. The result
/// is the canonical order used for existence checks and sub-path layout.
pub fn clean_vars<I, S>(vars: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    vars.into_iter()
        .map(|var| clean_var(var.as_ref()))
        .filter(|var| !var.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
