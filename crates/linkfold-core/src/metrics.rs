//! Ranking metrics for binary link prediction.
//!
//! | Metric | Range | Definition |
//! |--------|-------|------------|
//! | AUC | [0, 1] | P(score(pos) > score(neg)), ties count half (Mann-Whitney U) |
//! | AP | [0, 1] | Σ (R_n - R_{n-1}) P_n over descending score thresholds |
//!
//! Both are invariant to the order of the input pairs. Tied scores are
//! treated as one threshold, so shuffling never changes the result.
//!
//! A split with no positives or no negatives has no defined ranking; these
//! functions return [`Error::InsufficientPositives`] instead of NaN. NaN or
//! infinite scores are rejected with [`Error::NonFiniteScore`].

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// AUC and AP for one evaluation split.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkScores {
    pub auc: f64,
    pub ap: f64,
}

impl LinkScores {
    /// Score a split from positive and negative pair scores.
    ///
    /// `split` names the split in the error when either side is empty.
    pub fn from_scores(split: &str, pos_scores: &[f64], neg_scores: &[f64]) -> Result<Self> {
        check_nonempty(split, pos_scores.len(), neg_scores.len())?;
        let (scores, labels) = concat_labeled(pos_scores, neg_scores);
        check_finite(split, &scores)?;
        Ok(Self {
            auc: roc_auc_unchecked(&scores, &labels, pos_scores.len(), neg_scores.len()),
            ap: average_precision_unchecked(&scores, &labels, pos_scores.len()),
        })
    }
}

/// Validation and test scores from one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    pub valid: LinkScores,
    pub test: LinkScores,
}

/// Area under the ROC curve.
///
/// `labels[i]` is true for positives. Tied scores receive their average rank.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Result<f64> {
    let (pos, neg) = count_labels(scores, labels)?;
    check_nonempty("roc_auc", pos, neg)?;
    check_finite("roc_auc", scores)?;
    Ok(roc_auc_unchecked(scores, labels, pos, neg))
}

/// Average precision (area under the step-wise precision-recall curve).
pub fn average_precision(scores: &[f64], labels: &[bool]) -> Result<f64> {
    let (pos, neg) = count_labels(scores, labels)?;
    check_nonempty("average_precision", pos, neg)?;
    check_finite("average_precision", scores)?;
    Ok(average_precision_unchecked(scores, labels, pos))
}

fn count_labels(scores: &[f64], labels: &[bool]) -> Result<(usize, usize)> {
    if scores.len() != labels.len() {
        return Err(Error::InvalidConfig(format!(
            "{} scores but {} labels",
            scores.len(),
            labels.len()
        )));
    }
    let pos = labels.iter().filter(|&&l| l).count();
    Ok((pos, labels.len() - pos))
}

fn check_nonempty(split: &str, positives: usize, negatives: usize) -> Result<()> {
    if positives == 0 || negatives == 0 {
        return Err(Error::InsufficientPositives {
            split: split.to_string(),
            positives,
            negatives,
        });
    }
    Ok(())
}

fn check_finite(split: &str, scores: &[f64]) -> Result<()> {
    match scores.iter().position(|s| !s.is_finite()) {
        Some(index) => Err(Error::NonFiniteScore {
            split: split.to_string(),
            index,
            value: scores[index],
        }),
        None => Ok(()),
    }
}

fn concat_labeled(pos: &[f64], neg: &[f64]) -> (Vec<f64>, Vec<bool>) {
    let mut scores = Vec::with_capacity(pos.len() + neg.len());
    scores.extend_from_slice(pos);
    scores.extend_from_slice(neg);
    let mut labels = vec![true; pos.len()];
    labels.resize(pos.len() + neg.len(), false);
    (scores, labels)
}

/// Indices sorted by score, ascending. Scores must be finite.
fn ascending(scores: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..scores.len()).collect();
    idx.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    idx
}

fn roc_auc_unchecked(scores: &[f64], labels: &[bool], pos: usize, neg: usize) -> f64 {
    let order = ascending(scores);
    let n = order.len();

    let mut rank_sum_pos = 0.0f64;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        // 1-indexed ranks i+1..=j share their mean.
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let tied_pos = order[i..j].iter().filter(|&&k| labels[k]).count();
        rank_sum_pos += avg_rank * tied_pos as f64;
        i = j;
    }

    let p = pos as f64;
    let u = rank_sum_pos - p * (p + 1.0) / 2.0;
    (u / (p * neg as f64)).clamp(0.0, 1.0)
}

fn average_precision_unchecked(scores: &[f64], labels: &[bool], pos: usize) -> f64 {
    let mut order = ascending(scores);
    order.reverse();

    let mut ap = 0.0f64;
    let mut tp = 0usize;
    let mut seen = 0usize;
    let mut prev_recall = 0.0f64;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j < order.len() && scores[order[j]] == scores[order[i]] {
            if labels[order[j]] {
                tp += 1;
            }
            j += 1;
        }
        seen += j - i;

        let recall = tp as f64 / pos as f64;
        let precision = tp as f64 / seen as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
        i = j;
    }
    ap.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn test_perfect_and_inverse_separation() {
        let s = LinkScores::from_scores("t", &[0.8, 0.9, 1.0], &[0.1, 0.2, 0.3]).unwrap();
        assert!(approx(s.auc, 1.0));
        assert!(approx(s.ap, 1.0));

        let s = LinkScores::from_scores("t", &[0.1, 0.2], &[0.8, 0.9]).unwrap();
        assert!(approx(s.auc, 0.0));
    }

    #[test]
    fn test_known_auc() {
        // ranks 1..5 for 1(N) 2(N) 3(P) 4(N) 5(P): U = 8 - 3 = 5, AUC = 5/6.
        let auc = roc_auc(&[3.0, 5.0, 1.0, 2.0, 4.0], &[true, true, false, false, false]).unwrap();
        assert!(approx(auc, 5.0 / 6.0));
    }

    #[test]
    fn test_known_average_precision() {
        // Descending: 0.9(P) 0.8(N) 0.7(P) 0.1(N)
        // AP = 0.5 * 1/1 + 0.5 * 2/3
        let ap = average_precision(&[0.9, 0.8, 0.7, 0.1], &[true, false, true, false]).unwrap();
        assert!(approx(ap, 0.5 + 1.0 / 3.0));
    }

    #[test]
    fn test_all_ties() {
        let s = LinkScores::from_scores("t", &[0.5, 0.5], &[0.5, 0.5, 0.5]).unwrap();
        assert!(approx(s.auc, 0.5));
        // One threshold: recall jumps to 1 at precision 2/5.
        assert!(approx(s.ap, 0.4));
    }

    #[test]
    fn test_order_invariant() {
        let scores = [0.3, 0.7, 0.7, 0.2, 0.9, 0.1];
        let labels = [true, false, true, false, true, false];
        let auc = roc_auc(&scores, &labels).unwrap();
        let ap = average_precision(&scores, &labels).unwrap();

        let perm = [5, 2, 0, 4, 1, 3];
        let s2: Vec<f64> = perm.iter().map(|&i| scores[i]).collect();
        let l2: Vec<bool> = perm.iter().map(|&i| labels[i]).collect();
        assert!(approx(auc, roc_auc(&s2, &l2).unwrap()));
        assert!(approx(ap, average_precision(&s2, &l2).unwrap()));
    }

    #[test]
    fn test_empty_side_is_an_error() {
        assert!(matches!(
            LinkScores::from_scores("valid", &[], &[0.1]),
            Err(Error::InsufficientPositives { positives: 0, negatives: 1, .. })
        ));
        assert!(matches!(
            roc_auc(&[0.1, 0.2], &[true, true]),
            Err(Error::InsufficientPositives { .. })
        ));
        assert!(roc_auc(&[0.1], &[true, false]).is_err());
    }

    #[test]
    fn test_non_finite_scores_are_rejected() {
        assert!(matches!(
            LinkScores::from_scores("test", &[0.9, f64::NAN], &[0.1]),
            Err(Error::NonFiniteScore { index: 1, .. })
        ));
        assert!(matches!(
            LinkScores::from_scores("valid", &[0.9], &[f64::INFINITY]),
            Err(Error::NonFiniteScore { index: 1, .. })
        ));
        assert!(matches!(
            roc_auc(&[f64::NAN, 0.2], &[true, false]),
            Err(Error::NonFiniteScore { index: 0, .. })
        ));
        assert!(average_precision(&[0.3, f64::NEG_INFINITY], &[true, false]).is_err());
    }
}
