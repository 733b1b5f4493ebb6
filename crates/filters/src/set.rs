use crate::rule::{CompiledRule, FilterParseError, FilterRule};

/// An ordered, compiled rule list.
///
/// Matching scans the list in order and the first applicable rule decides;
/// an entry no rule applies to is selected. The same scan drives the
/// deletion pass, where a first-matching exclude protects a destination
/// entry instead of dropping a source one.
#[derive(Clone, Debug, Default)]
pub struct FilterSet {
    rules: Vec<CompiledRule>,
}

impl FilterSet {
    /// An empty set; selects everything.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compiles a list of already-constructed rules.
    pub fn from_rules(
        rules: impl IntoIterator<Item = FilterRule>,
    ) -> Result<Self, FilterParseError> {
        let rules = rules
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Parses and compiles a list of rule strings.
    pub fn parse<I, S>(rules: I) -> Result<Self, FilterParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|text| FilterRule::parse(text.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rules(rules)
    }

    /// Whether the set contains no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The first rule that applies to the entry, in list order.
    #[must_use]
    pub fn first_match(&self, path: &str, is_dir: bool, base: Option<&str>) -> Option<&FilterRule> {
        self.rules
            .iter()
            .find(|rule| rule.applies(path, is_dir, base))
            .map(CompiledRule::rule)
    }

    /// First-match selection: `true` when the entry is kept.
    #[must_use]
    pub fn selects(&self, path: &str, is_dir: bool, base: Option<&str>) -> bool {
        match self.first_match(path, is_dir, base) {
            Some(rule) => rule.polarity() == crate::Polarity::Include,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Polarity;
    use proptest::prelude::*;

    #[test]
    fn empty_set_selects_everything() {
        let set = FilterSet::empty();
        assert!(set.selects("/a/b", false, Some("/a")));
    }

    #[test]
    fn first_applicable_rule_wins() {
        let set = FilterSet::parse(["+ keep*", "- *"]).expect("compile");
        assert!(set.selects("/a/keeper", false, Some("/a")));
        assert!(!set.selects("/a/other", false, Some("/a")));
    }

    #[test]
    fn later_include_cannot_rescue_earlier_exclude() {
        let set = FilterSet::parse(["- *.tmp", "+ important.tmp"]).expect("compile");
        assert!(!set.selects("/a/important.tmp", false, Some("/a")));
    }

    #[test]
    fn first_match_exposes_polarity_for_deletion_pass() {
        let set = FilterSet::parse(["- protected"]).expect("compile");
        let rule = set
            .first_match("/dst/protected", true, Some("/dst"))
            .expect("a rule applies");
        assert_eq!(rule.polarity(), Polarity::Exclude);
        assert!(set.first_match("/dst/other", true, Some("/dst")).is_none());
    }

    #[test]
    fn dir_only_rule_is_skipped_for_files() {
        let set = FilterSet::parse(["- logs/", "+ *"]).expect("compile");
        assert!(!set.selects("/a/logs", true, Some("/a")));
        assert!(set.selects("/a/logs", false, Some("/a")));
    }

    proptest! {
        // Selection is exactly "first applicable rule is an include, or no
        // rule applies" over arbitrary ascii names.
        #[test]
        fn selection_matches_first_applicable(name in "[a-z]{1,8}(\\.[a-z]{1,3})?") {
            let set = FilterSet::parse(["+ *.keep", "- *.tmp", "+ a*", "- *"]).expect("compile");
            let path = format!("/base/{name}");
            let selected = set.selects(&path, false, Some("/base"));
            let expected = match set.first_match(&path, false, Some("/base")) {
                Some(rule) => rule.polarity() == Polarity::Include,
                None => true,
            };
            prop_assert_eq!(selected, expected);
        }

        // A lone exclude-everything rule drops every entry.
        #[test]
        fn exclude_star_drops_all(name in "[a-z]{1,12}") {
            let set = FilterSet::parse(["- *"]).expect("compile");
            let path = format!("/base/{name}");
            prop_assert!(!set.selects(&path, false, Some("/base")));
        }
    }
}
