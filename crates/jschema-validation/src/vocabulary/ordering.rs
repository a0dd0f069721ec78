//! Keyword evaluation order.

use super::AFTER_ALL;

/// Order the keywords of one schema object for evaluation.
///
/// `keywords` holds each present keyword's name and dependency list, in
/// document order. Returns indices into `keywords`: a stable topological
/// sort where a keyword runs after every present keyword it depends on and
/// otherwise keeps its document position. Dependencies on absent keywords
/// are ignored. A dependency cycle (possible only with custom keywords) is
/// broken by falling back to document order for the keywords involved.
pub(crate) fn evaluation_order(keywords: &[(&str, &[String])]) -> Vec<usize> {
    let after_all = |deps: &[String]| deps.iter().any(|dep| dep == AFTER_ALL);

    let prerequisites: Vec<Vec<usize>> = keywords
        .iter()
        .enumerate()
        .map(|(i, &(_, deps))| {
            keywords
                .iter()
                .enumerate()
                .filter(|&(j, &(name, other_deps))| {
                    j != i
                        && (deps.iter().any(|dep| dep == name)
                            || (after_all(deps) && !after_all(other_deps)))
                })
                .map(|(j, _)| j)
                .collect()
        })
        .collect();

    let mut emitted = vec![false; keywords.len()];
    let mut order = Vec::with_capacity(keywords.len());
    while order.len() < keywords.len() {
        let ready = (0..keywords.len())
            .find(|&i| !emitted[i] && prerequisites[i].iter().all(|&j| emitted[j]));
        let next = match ready {
            Some(i) => i,
            None => {
                let stuck = (0..keywords.len()).find(|&i| !emitted[i]);
                let Some(i) = stuck else { break };
                tracing::warn!(
                    keyword = keywords[i].0,
                    "keyword dependency cycle; using document order"
                );
                i
            }
        };
        emitted[next] = true;
        order.push(next);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(keywords: &[(&str, Vec<String>)]) -> Vec<String> {
        let borrowed: Vec<(&str, &[String])> = keywords
            .iter()
            .map(|(name, deps)| (*name, deps.as_slice()))
            .collect();
        evaluation_order(&borrowed)
            .into_iter()
            .map(|i| keywords[i].0.to_string())
            .collect()
    }

    fn deps(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_dependencies_run_first() {
        let keywords = vec![
            ("additionalProperties", deps(&["properties", "patternProperties"])),
            ("type", deps(&[])),
            ("properties", deps(&[])),
        ];
        assert_eq!(names(&keywords), ["type", "properties", "additionalProperties"]);
    }

    #[test]
    fn test_then_else_after_if() {
        let keywords = vec![
            ("else", deps(&["if"])),
            ("then", deps(&["if"])),
            ("if", deps(&[])),
        ];
        assert_eq!(names(&keywords), ["if", "else", "then"]);
    }

    #[test]
    fn test_after_all_runs_last() {
        let keywords = vec![
            ("unevaluatedProperties", deps(&[AFTER_ALL])),
            ("allOf", deps(&[])),
            ("unevaluatedItems", deps(&[AFTER_ALL])),
            ("$ref", deps(&[])),
        ];
        assert_eq!(
            names(&keywords),
            ["allOf", "$ref", "unevaluatedProperties", "unevaluatedItems"]
        );
    }

    #[test]
    fn test_contains_chain_and_prefix_items() {
        let keywords = vec![
            ("minContains", deps(&["contains"])),
            ("maxContains", deps(&["contains"])),
            ("items", deps(&["prefixItems"])),
            ("contains", deps(&[])),
            ("prefixItems", deps(&[])),
        ];
        assert_eq!(
            names(&keywords),
            ["contains", "minContains", "maxContains", "prefixItems", "items"]
        );
    }

    #[test]
    fn test_cycle_falls_back_to_document_order() {
        let keywords = vec![("a", deps(&["b"])), ("b", deps(&["a"])), ("c", deps(&[]))];
        assert_eq!(names(&keywords), ["c", "a", "b"]);
    }
}
