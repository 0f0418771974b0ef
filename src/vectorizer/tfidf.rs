use indexmap::IndexMap;
use num::{Float, NumCast};

use crate::error::Result;
use crate::utils::sparse::SparseVec;
use crate::vectorizer::{corpus::Corpus, term::TermFrequency};

/// Pluggable TF-IDF weighting used by [`crate::TfidfVectorizer`].
pub trait TFIDFEngine<N>
where
    N: Float,
{
    /// IDF weight per vocabulary position
    /// # Arguments
    /// * `corpus` - statistics of the fit corpus
    /// * `vocabulary` - term -> feature position
    fn idf_vec(corpus: &Corpus, vocabulary: &IndexMap<Box<str>, u32>) -> Vec<N>;

    /// Weighted feature vector of one document against a frozen vocabulary.
    /// Terms missing from `vocabulary` contribute nothing.
    fn tf_idf_vec(freq: &TermFrequency, vocabulary: &IndexMap<Box<str>, u32>, idf: &[N]) -> Result<SparseVec<N>>;
}

/// Default engine: smoothed IDF, raw counts, L2-normalized rows.
///
/// `idf(t) = ln((1 + n) / (1 + df(t))) + 1`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTFIDFEngine;

#[inline]
fn cast<N: Float>(v: f64) -> N {
    <N as NumCast>::from(v).unwrap_or_else(N::zero)
}

impl<N> TFIDFEngine<N> for DefaultTFIDFEngine
where
    N: Float,
{
    fn idf_vec(corpus: &Corpus, vocabulary: &IndexMap<Box<str>, u32>) -> Vec<N> {
        let doc_num = corpus.get_doc_num() as f64;
        let mut idf_vec = vec![N::zero(); vocabulary.len()];
        for (term, &idx) in vocabulary {
            let doc_freq = corpus.get_doc_freq(term) as f64;
            idf_vec[idx as usize] = cast(((1.0 + doc_num) / (1.0 + doc_freq)).ln() + 1.0);
        }
        idf_vec
    }

    fn tf_idf_vec(freq: &TermFrequency, vocabulary: &IndexMap<Box<str>, u32>, idf: &[N]) -> Result<SparseVec<N>> {
        let pairs = freq
            .iter()
            .filter_map(|(term, count)| {
                vocabulary
                    .get(term)
                    .map(|&idx| (idx, cast::<N>(count as f64) * idf[idx as usize]))
            })
            .collect();
        let mut vec = SparseVec::from_pairs(vocabulary.len() as u32, pairs)?;
        vec.normalize_l2();
        Ok(vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(terms: &[&str]) -> IndexMap<Box<str>, u32> {
        terms.iter().enumerate().map(|(i, t)| (Box::<str>::from(*t), i as u32)).collect()
    }

    #[test]
    fn idf_is_smoothed() {
        let mut corpus = Corpus::new();
        let mut a = TermFrequency::new();
        a.add_terms(&["x", "y"]);
        let mut b = TermFrequency::new();
        b.add_terms(&["x"]);
        corpus.add_doc(&a);
        corpus.add_doc(&b);

        let idf: Vec<f64> = <DefaultTFIDFEngine as TFIDFEngine<f64>>::idf_vec(&corpus, &vocab(&["x", "y"]));
        assert!((idf[0] - 1.0).abs() < 1e-12);
        assert!((idf[1] - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn unknown_terms_are_ignored_and_row_is_unit_length() {
        let mut freq = TermFrequency::new();
        freq.add_terms(&["x", "x", "unseen", "y"]);
        let v: SparseVec<f32> =
            DefaultTFIDFEngine::tf_idf_vec(&freq, &vocab(&["x", "y"]), &[1.0, 1.0]).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.nnz(), 2);
        assert!((v.norm_l2() - 1.0).abs() < 1e-6);
        assert!(v.get(0) > v.get(1));
    }
}
