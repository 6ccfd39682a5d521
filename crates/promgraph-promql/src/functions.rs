//! Table of PromQL functions known to the parser.

/// Name and accepted argument count of a PromQL function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Function {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` for variadic functions.
    pub max_args: Option<usize>,
}

const fn func(name: &'static str, min_args: usize, max_args: usize) -> Function {
    Function {
        name,
        min_args,
        max_args: Some(max_args),
    }
}

const fn variadic(name: &'static str, min_args: usize) -> Function {
    Function {
        name,
        min_args,
        max_args: None,
    }
}

static FUNCTIONS: &[Function] = &[
    func("abs", 1, 1),
    func("absent", 1, 1),
    func("absent_over_time", 1, 1),
    func("acos", 1, 1),
    func("acosh", 1, 1),
    func("asin", 1, 1),
    func("asinh", 1, 1),
    func("atan", 1, 1),
    func("atanh", 1, 1),
    func("avg_over_time", 1, 1),
    func("ceil", 1, 1),
    func("changes", 1, 1),
    func("clamp", 3, 3),
    func("clamp_max", 2, 2),
    func("clamp_min", 2, 2),
    func("cos", 1, 1),
    func("cosh", 1, 1),
    func("count_over_time", 1, 1),
    func("day_of_month", 0, 1),
    func("day_of_week", 0, 1),
    func("day_of_year", 0, 1),
    func("days_in_month", 0, 1),
    func("deg", 1, 1),
    func("delta", 1, 1),
    func("deriv", 1, 1),
    func("double_exponential_smoothing", 3, 3),
    func("exp", 1, 1),
    func("floor", 1, 1),
    func("histogram_avg", 1, 1),
    func("histogram_count", 1, 1),
    func("histogram_fraction", 3, 3),
    func("histogram_quantile", 2, 2),
    func("histogram_stddev", 1, 1),
    func("histogram_stdvar", 1, 1),
    func("histogram_sum", 1, 1),
    func("holt_winters", 3, 3),
    func("hour", 0, 1),
    func("idelta", 1, 1),
    func("increase", 1, 1),
    func("info", 1, 2),
    func("irate", 1, 1),
    variadic("label_join", 3),
    func("label_replace", 5, 5),
    func("last_over_time", 1, 1),
    func("ln", 1, 1),
    func("log10", 1, 1),
    func("log2", 1, 1),
    func("mad_over_time", 1, 1),
    func("max_over_time", 1, 1),
    func("min_over_time", 1, 1),
    func("minute", 0, 1),
    func("month", 0, 1),
    func("pi", 0, 0),
    func("predict_linear", 2, 2),
    func("present_over_time", 1, 1),
    func("quantile_over_time", 2, 2),
    func("rad", 1, 1),
    func("rate", 1, 1),
    func("resets", 1, 1),
    func("round", 1, 2),
    func("scalar", 1, 1),
    func("sgn", 1, 1),
    func("sin", 1, 1),
    func("sinh", 1, 1),
    func("sort", 1, 1),
    variadic("sort_by_label", 1),
    variadic("sort_by_label_desc", 1),
    func("sort_desc", 1, 1),
    func("sqrt", 1, 1),
    func("stddev_over_time", 1, 1),
    func("stdvar_over_time", 1, 1),
    func("sum_over_time", 1, 1),
    func("tan", 1, 1),
    func("tanh", 1, 1),
    func("time", 0, 0),
    func("timestamp", 1, 1),
    func("vector", 1, 1),
    func("year", 0, 1),
];

/// Look up a function by its exact name.
pub fn lookup(name: &str) -> Option<&'static Function> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

impl Function {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let rate = lookup("rate").unwrap();
        assert!(rate.accepts(1));
        assert!(!rate.accepts(2));
        assert!(lookup("Rate").is_none());
        assert!(lookup("no_such_function").is_none());
    }

    #[test]
    fn test_variadic() {
        let join = lookup("label_join").unwrap();
        assert!(!join.accepts(2));
        assert!(join.accepts(3));
        assert!(join.accepts(7));
    }

    #[test]
    fn test_table_is_sorted() {
        let names: Vec<&str> = FUNCTIONS.iter().map(|f| f.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
