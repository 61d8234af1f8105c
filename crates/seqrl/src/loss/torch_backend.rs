//! `LossTensor` for libtorch tensors.

use super::LossTensor;
use crate::{Result, SeqRlError};
use ndarray::{ArrayD, IxDyn};
use tch::{Kind, Tensor};

impl LossTensor for Tensor {
    fn from_array(values: ArrayD<f32>, like: &Self) -> Result<Self> {
        let shape: Vec<i64> = values.shape().iter().map(|&d| d as i64).collect();
        let flat: Vec<f32> = values.iter().copied().collect();
        Ok(Tensor::from_slice(&flat)
            .reshape(shape.as_slice())
            .to_device(like.device()))
    }

    fn to_array(&self) -> Result<ArrayD<f32>> {
        let shape: Vec<usize> = self.size().iter().map(|&d| d as usize).collect();
        let flat = Vec::<f32>::try_from(
            self.detach()
                .to_kind(Kind::Float)
                .to_device(tch::Device::Cpu)
                .flatten(0, -1),
        )?;
        let actual = vec![flat.len()];
        ArrayD::from_shape_vec(IxDyn(&shape), flat).map_err(|_| SeqRlError::ShapeMismatch {
            expected: shape,
            actual,
        })
    }

    fn shape(&self) -> Vec<usize> {
        self.size().iter().map(|&d| d as usize).collect()
    }

    fn masked(&self, mask: &Self) -> Self {
        self.where_self(&mask.gt(0.5), &self.zeros_like())
    }

    fn row_sum(&self) -> Self {
        self.sum_dim_intlist([1i64].as_slice(), false, Kind::Float)
    }

    fn row_mean(&self) -> Self {
        self.mean_dim([1i64].as_slice(), false, Kind::Float)
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
        self * factor
    }

    fn squared(&self) -> Self {
        self.pow_tensor_scalar(2.0)
    }

    fn one_over(&self) -> Self {
        self.reciprocal()
    }

    fn mean_all(&self) -> Self {
        self.mean(Kind::Float)
    }

    fn detached(&self) -> Self {
        self.detach()
    }

    fn scalar(&self) -> Result<f64> {
        Ok(self.detach().to_kind(Kind::Double).mean(Kind::Double).double_value(&[]))
    }
}
