//! `LossTensor` for plain `ndarray` arrays (no autograd).

use super::LossTensor;
use crate::Result;
use ndarray::{arr0, ArrayD, Axis, Zip};

impl LossTensor for ArrayD<f32> {
    fn from_array(values: ArrayD<f32>, _like: &Self) -> Result<Self> {
        Ok(values)
    }

    fn to_array(&self) -> Result<ArrayD<f32>> {
        Ok(self.clone())
    }

    fn shape(&self) -> Vec<usize> {
        ArrayD::shape(self).to_vec()
    }

    fn masked(&self, mask: &Self) -> Self {
        Zip::from(self)
            .and(mask)
            .map_collect(|&x, &m| if m > 0.5 { x } else { 0.0 })
    }

    fn row_sum(&self) -> Self {
        self.sum_axis(Axis(1))
    }

    fn row_mean(&self) -> Self {
        let width = self.len_of(Axis(1)).max(1) as f32;
        self.sum_axis(Axis(1)) / width
    }

    fn plus(&self, other: &Self) -> Self {
        self + other
    }

    fn minus(&self, other: &Self) -> Self {
        self - other
    }

    fn times(&self, other: &Self) -> Self {
        self * other
    }

    fn scaled(&self, factor: f64) -> Self {
        self * factor as f32
    }

    fn squared(&self) -> Self {
        self.mapv(|x| x * x)
    }

    fn one_over(&self) -> Self {
        self.mapv(|x| 1.0 / x)
    }

    fn mean_all(&self) -> Self {
        let n = self.len().max(1) as f32;
        arr0(self.sum() / n).into_dyn()
    }

    fn detached(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_row_reductions() {
        let x = arr2(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn();
        assert_eq!(x.row_sum().to_array().unwrap().as_slice().unwrap(), &[6.0, 15.0]);
        assert_eq!(x.row_mean().to_array().unwrap().as_slice().unwrap(), &[2.0, 5.0]);
        assert_eq!(x.mean_all().scalar().unwrap(), 3.5);
    }

    #[test]
    fn test_elementwise() {
        let x = arr2(&[[2.0f32, -4.0]]).into_dyn();
        assert_eq!(x.squared().as_slice().unwrap(), &[4.0, 16.0]);
        assert_eq!(x.one_over().as_slice().unwrap(), &[0.5, -0.25]);
        assert_eq!(x.scaled(-0.5).as_slice().unwrap(), &[-1.0, 2.0]);
        assert_eq!(x.minus(&x).as_slice().unwrap(), &[0.0, 0.0]);
    }
}
