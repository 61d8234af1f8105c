//! libtorch optimizer wrapper.

use crate::policy::Optimizer;
use crate::Result;
use tch::{nn, nn::OptimizerConfig, Tensor};

/// Adam over a policy's trainable variables with optional global-norm
/// gradient clipping.
pub struct TorchOptimizer {
    inner: nn::Optimizer,
    variables: Vec<Tensor>,
    max_grad_norm: Option<f64>,
}

impl TorchOptimizer {
    pub fn new(inner: nn::Optimizer, variables: Vec<Tensor>, max_grad_norm: Option<f64>) -> Self {
        Self {
            inner,
            variables,
            max_grad_norm,
        }
    }

    /// Adam over every trainable variable in `vs`
    pub fn adam(vs: &nn::VarStore, learning_rate: f64, max_grad_norm: Option<f64>) -> Result<Self> {
        let inner = nn::Adam::default().build(vs, learning_rate)?;
        Ok(Self::new(inner, vs.trainable_variables(), max_grad_norm))
    }

    /// Global L2 norm of the current gradients
    pub fn grad_norm(&self) -> f64 {
        let mut global_norm = 0.0f64;
        for var in &self.variables {
            let grad = var.grad();
            if grad.defined() {
                global_norm += grad
                    .pow_tensor_scalar(2.0)
                    .sum(tch::Kind::Float)
                    .double_value(&[]);
            }
        }
        global_norm.sqrt()
    }

    /// Rescale gradients so their global norm is at most `max_norm`
    pub fn clip_grad_norm(&mut self, max_norm: f64) {
        let global_norm = self.grad_norm();
        if global_norm > max_norm {
            let clip_coef = max_norm / (global_norm + 1e-6);
            for var in &self.variables {
                let mut grad = var.grad();
                if grad.defined() {
                    let _ = grad.f_mul_scalar_(clip_coef);
                }
            }
        }
    }
}

impl Optimizer<Tensor> for TorchOptimizer {
    fn step(&mut self, loss: &Tensor) -> Result<()> {
        self.inner.zero_grad();
        loss.f_backward()?;
        if let Some(max_norm) = self.max_grad_norm {
            self.clip_grad_norm(max_norm);
        }
        self.inner.step();
        Ok(())
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.inner.set_lr(learning_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_step_moves_parameters() {
        let vs = nn::VarStore::new(Device::Cpu);
        let w = vs.root().var("w", &[2], nn::Init::Const(1.0));
        let mut optimizer = TorchOptimizer::adam(&vs, 0.1, Some(0.5)).unwrap();

        let loss = (&w * &w).sum(Kind::Float);
        optimizer.step(&loss).unwrap();
        assert!(optimizer.grad_norm() <= 0.5 + 1e-4);

        let after = Vec::<f32>::try_from(&w).unwrap();
        assert!(after.iter().all(|&x| x < 1.0));
    }

    #[test]
    fn test_zero_learning_rate_freezes_parameters() {
        let vs = nn::VarStore::new(Device::Cpu);
        let w = vs.root().var("w", &[2], nn::Init::Const(1.0));
        let mut optimizer = TorchOptimizer::adam(&vs, 0.1, None).unwrap();
        optimizer.set_learning_rate(0.0);

        let loss = (&w * &w).sum(Kind::Float);
        optimizer.step(&loss).unwrap();
        assert_eq!(Vec::<f32>::try_from(&w).unwrap(), vec![1.0, 1.0]);
    }
}
