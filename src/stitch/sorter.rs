use std::borrow::Borrow;

use crate::data::model::Spectrum;

/// Segments reordered by ascending minimum wavelength.
#[derive(Debug, Clone)]
pub struct SortedSegments<'a> {
    /// `order[k]` is the input index of the k-th sorted segment.
    pub order: Vec<usize>,
    pub segments: Vec<&'a Spectrum>,
}

/// Sort segments by their first wavelength. Equal starts keep input order.
pub fn sort_segments<S: Borrow<Spectrum>>(segments: &[S]) -> SortedSegments<'_> {
    let mut order: Vec<usize> = (0..segments.len()).collect();
    // sort_by is stable
    order.sort_by(|&a, &b| {
        let (a, b): (&Spectrum, &Spectrum) = (segments[a].borrow(), segments[b].borrow());
        a.min_wavelength().total_cmp(&b.min_wavelength())
    });
    let sorted = order.iter().map(|&i| segments[i].borrow()).collect();
    SortedSegments {
        order,
        segments: sorted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{FluxUnit, WavelengthUnit};

    fn seg(start: f64) -> Spectrum {
        Spectrum::without_uncertainty(
            vec![start, start + 1.0],
            vec![0.0, 0.0],
            WavelengthUnit::Micron,
            FluxUnit::Jansky,
        )
        .unwrap()
    }

    #[test]
    fn orders_by_minimum_wavelength() {
        let input = vec![seg(12.0), seg(5.0), seg(8.0)];
        let sorted = sort_segments(&input);
        assert_eq!(sorted.order, vec![1, 2, 0]);
        assert_eq!(sorted.segments[0].min_wavelength(), 5.0);
    }

    #[test]
    fn ties_keep_input_order() {
        let input = vec![seg(3.0), seg(1.0), seg(3.0), seg(1.0)];
        let sorted = sort_segments(&input);
        assert_eq!(sorted.order, vec![1, 3, 0, 2]);
    }
}
