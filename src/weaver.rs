// SPDX-License-Identifier: Apache-2.0

//! Domain-agnostic string clustering and optimal bipartite matching
//! (§4.G), used by the module catalog's bus-attachment algorithm. Pure
//! and deterministic; every function here is allowed to return an empty
//! result rather than guessing.

use std::collections::HashMap;

use indexmap::IndexMap;

const MIN_SUBSTRING_LEN: usize = 3;
const FREQUENCY_THRESHOLD: usize = 2;

/// All substrings of length >= `min_len` that appear in at least
/// `threshold` of `strings`, longest first.
pub fn extract_candidate_substrings(strings: &[String], min_len: usize, threshold: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for s in strings {
        let chars: Vec<char> = s.chars().collect();
        let mut seen_in_this_string: std::collections::HashSet<String> = std::collections::HashSet::new();
        for start in 0..chars.len() {
            for end in (start + min_len)..=chars.len() {
                let candidate: String = chars[start..end].iter().collect();
                seen_in_this_string.insert(candidate);
            }
        }
        for candidate in seen_in_this_string {
            *counts.entry(candidate).or_insert(0) += 1;
        }
    }

    let mut candidates: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count >= threshold)
        .map(|(s, _)| s)
        .collect();
    candidates.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    candidates
}

/// Assigns each string to the longest candidate substring it contains;
/// strings matching no candidate form a singleton cluster keyed by
/// themselves.
pub fn cluster_strings(strings: &[String]) -> IndexMap<String, Vec<String>> {
    let candidates = extract_candidate_substrings(strings, MIN_SUBSTRING_LEN, FREQUENCY_THRESHOLD);
    let mut clusters: IndexMap<String, Vec<String>> = IndexMap::new();
    for s in strings {
        let marker = candidates
            .iter()
            .find(|candidate| s.contains(candidate.as_str()))
            .cloned()
            .unwrap_or_else(|| s.clone());
        clusters.entry(marker).or_default().push(s.clone());
    }
    clusters
}

/// Returns the cluster marker whose content shares the longest common
/// subsequence with `hint` (case-insensitive).
pub fn find_best_group_marker_for_hint<'a>(hint: &str, markers: impl IntoIterator<Item = &'a String>) -> Option<&'a String> {
    let hint_lower = hint.to_lowercase();
    markers
        .into_iter()
        .max_by_key(|marker| lcs_len(&hint_lower, &marker.to_lowercase()))
}

/// Longest common subsequence length between two strings.
pub fn lcs_len(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp[a.len()][b.len()]
}

/// Similarity between two names once `marker` has been stripped as a
/// shared prefix from both: LCS length over the symmetric-difference
/// length (0 similarity when both strings are empty after stripping).
fn similarity(a: &str, b: &str, marker: &str) -> f64 {
    let strip = |s: &str| -> String {
        s.strip_prefix(marker).unwrap_or(s).to_lowercase()
    };
    let a = strip(a);
    let b = strip(b);
    let lcs = lcs_len(&a, &b) as f64;
    let sym_diff = (a.len() + b.len()).saturating_sub(2 * lcs as usize).max(1) as f64;
    lcs / sym_diff
}

/// One-to-one assignment of `right` names to `left` names maximizing
/// total LCS-based similarity, solved with the Hungarian algorithm on the
/// negated similarity matrix (so minimization finds the maximum-weight
/// matching). Unmatched names (zero similarity to everything, or surplus
/// on either side) are left out of the returned map.
pub fn find_optimal_matching(left: &[String], right: &[String], marker: &str) -> IndexMap<String, String> {
    if left.is_empty() || right.is_empty() {
        return IndexMap::new();
    }

    let n = left.len().max(right.len());
    let mut cost = vec![vec![0.0f64; n]; n];
    for (i, l) in left.iter().enumerate() {
        for (j, r) in right.iter().enumerate() {
            cost[i][j] = -similarity(l, r, marker);
        }
    }

    let assignment = hungarian(&cost);

    let mut result = IndexMap::new();
    for (i, &j) in assignment.iter().enumerate() {
        if i < left.len() && j < right.len() && cost[i][j] < 0.0 {
            result.insert(right[j].clone(), left[i].clone());
        }
    }
    result
}

/// Minimum-cost perfect assignment on a square cost matrix via the
/// Hungarian (Kuhn-Munkres) algorithm, O(n^3). Returns, for each row
/// index, the assigned column index.
fn hungarian(cost: &[Vec<f64>]) -> Vec<usize> {
    let n = cost.len();
    if n == 0 {
        return Vec::new();
    }
    const INF: f64 = f64::INFINITY;
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; n + 1];
    let mut p = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![INF; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = INF;
            let mut j1 = 0usize;
            for j in 1..=n {
                if !used[j] {
                    let cur = cost[i0 - 1][j - 1] - u[i0] - v[j];
                    if cur < minv[j] {
                        minv[j] = cur;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0usize; n];
    for j in 1..=n {
        if p[j] != 0 {
            assignment[p[j] - 1] = j - 1;
        }
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clusters_group_by_longest_common_substring() {
        let ports = vec![
            "s_axi_awvalid".to_string(),
            "s_axi_awready".to_string(),
            "s_axi_wvalid".to_string(),
            "irq".to_string(),
        ];
        let clusters = cluster_strings(&ports);
        let axi_cluster = clusters
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == "s_axi_awvalid"))
            .unwrap();
        assert!(axi_cluster.1.contains(&"s_axi_awready".to_string()));
        // irq has no frequent substring partner, forms a singleton
        assert!(clusters.contains_key("irq"));
    }

    #[test]
    fn hint_matching_prefers_lcs_similarity() {
        let markers = vec!["s_axi".to_string(), "m_ahb".to_string()];
        let best = find_best_group_marker_for_hint("axi_slave", &markers).unwrap();
        assert_eq!(best, "s_axi");
    }

    #[test]
    fn optimal_matching_is_one_to_one() {
        let module_ports = vec![
            "s_apb_paddr".to_string(),
            "s_apb_pwdata".to_string(),
            "s_apb_prdata".to_string(),
        ];
        let bus_signals = vec!["paddr".to_string(), "pwdata".to_string(), "prdata".to_string()];
        let mapping = find_optimal_matching(&module_ports, &bus_signals, "s_apb_");
        assert_eq!(mapping.get("paddr"), Some(&"s_apb_paddr".to_string()));
        assert_eq!(mapping.get("pwdata"), Some(&"s_apb_pwdata".to_string()));
        assert_eq!(mapping.get("prdata"), Some(&"s_apb_prdata".to_string()));

        // one-to-one: no module port used twice
        let mut used: Vec<&String> = mapping.values().collect();
        used.sort();
        used.dedup();
        assert_eq!(used.len(), mapping.len());
    }

    #[test]
    fn empty_inputs_yield_empty_mapping() {
        assert!(find_optimal_matching(&[], &["a".to_string()], "").is_empty());
        assert!(find_optimal_matching(&["a".to_string()], &[], "").is_empty());
    }
}
