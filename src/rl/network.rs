//! Convolutional action-value network for the Snake agent
//!
//! # Architecture
//!
//! ```text
//! Input: [batch, 3, H, W]
//!   ↓ Conv2d(3→16, k=3, p=1) + ReLU + MaxPool(2)
//!   ↓ Conv2d(16→32, k=3, p=1) + ReLU + MaxPool(2)
//!   ↓ Flatten: [batch, 32*(H/4)*(W/4)]
//!   ↓ Linear(→ 64) + ReLU
//!   ↓ Linear(64 → 16) + ReLU
//!   ↓ Linear(16 → 4) → Q-values
//! ```
//!
//! The trainer treats the network as an opaque `Q(state) -> action values`
//! function; nothing outside this module depends on the layer layout.
//!
//! # Example
//!
//! ```rust
//! use snake_dqn::rl::QNetworkConfig;
//! use burn::backend::ndarray::NdArrayDevice;
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//!
//! let device = NdArrayDevice::default();
//! let network = QNetworkConfig::new(20, 20).init::<NdArray<f32>>(&device);
//!
//! let q_values = network.forward(Tensor::zeros([8, 3, 20, 20], &device));
//! assert_eq!(q_values.dims(), [8, 4]);
//! ```

use burn::{
    module::Module,
    nn::{
        Linear, LinearConfig, PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
    },
    tensor::{Tensor, activation::relu, backend::Backend},
};
use serde::{Deserialize, Serialize};

use super::observation::OBSERVATION_CHANNELS;
use crate::game::NUM_ACTIONS;

/// Hyperparameters of the Q-network.
///
/// Stored inside checkpoints so a resumed run can refuse weights recorded for
/// a different board or layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetworkConfig {
    /// Number of observation planes (3: body, head, food)
    pub input_channels: usize,
    pub num_actions: usize,
    pub grid_height: usize,
    pub grid_width: usize,
    /// Output channels of the two convolution blocks
    pub conv_channels: [usize; 2],
    /// Widths of the two hidden fully connected layers
    pub hidden_dims: [usize; 2],
}

impl QNetworkConfig {
    pub fn new(grid_height: usize, grid_width: usize) -> Self {
        Self {
            input_channels: OBSERVATION_CHANNELS,
            num_actions: NUM_ACTIONS,
            grid_height,
            grid_width,
            conv_channels: [16, 32],
            hidden_dims: [64, 16],
        }
    }

    /// Shape of a single (unbatched) input
    pub fn input_shape(&self) -> [usize; 3] {
        [self.input_channels, self.grid_height, self.grid_width]
    }

    /// Width of the flattened feature map after both pooling stages
    pub fn flattened_dim(&self) -> usize {
        self.conv_channels[1] * (self.grid_height / 4) * (self.grid_width / 4)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.grid_height < 4 || self.grid_width < 4 {
            return Err(format!(
                "network needs a grid of at least 4x4, got {}x{}",
                self.grid_width, self.grid_height
            ));
        }
        if self.input_channels == 0 || self.num_actions == 0 {
            return Err("input_channels and num_actions must be positive".to_string());
        }
        if self.conv_channels.contains(&0) || self.hidden_dims.contains(&0) {
            return Err("layer widths must be positive".to_string());
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        let pool = || MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        QNetwork {
            conv1: Conv2dConfig::new([self.input_channels, self.conv_channels[0]], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            pool1: pool(),
            conv2: Conv2dConfig::new([self.conv_channels[0], self.conv_channels[1]], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            pool2: pool(),
            fc1: LinearConfig::new(self.flattened_dim(), self.hidden_dims[0]).init(device),
            fc2: LinearConfig::new(self.hidden_dims[0], self.hidden_dims[1]).init(device),
            output: LinearConfig::new(self.hidden_dims[1], self.num_actions).init(device),
        }
    }
}

impl Default for QNetworkConfig {
    fn default() -> Self {
        Self::new(20, 20)
    }
}

/// Action-value network: one Q-value per action for each observation
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    conv1: Conv2d<B>,
    pool1: MaxPool2d,
    conv2: Conv2d<B>,
    pool2: MaxPool2d,
    fc1: Linear<B>,
    fc2: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> QNetwork<B> {
    /// `[batch, C, H, W]` observations to `[batch, num_actions]` Q-values
    pub fn forward(&self, observation: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool1.forward(relu(self.conv1.forward(observation)));
        let x = self.pool2.forward(relu(self.conv2.forward(x)));

        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = relu(self.fc1.forward(x));
        let x = relu(self.fc2.forward(x));
        self.output.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::Autodiff;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::tensor::{Distribution, TensorData};

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn test_forward_pass_shapes() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new(20, 20).init::<TestBackend>(&device);

        for batch_size in [1, 4, 32] {
            let q_values = network.forward(Tensor::zeros([batch_size, 3, 20, 20], &device));
            assert_eq!(q_values.dims(), [batch_size, 4]);
        }
    }

    #[test]
    fn test_odd_grid_sizes() {
        let device = NdArrayDevice::default();
        for (h, w) in [(4, 4), (10, 10), (15, 30)] {
            let network = QNetworkConfig::new(h, w).init::<TestBackend>(&device);
            let q_values = network.forward(Tensor::zeros([2, 3, h, w], &device));
            assert_eq!(q_values.dims(), [2, 4]);
        }
    }

    #[test]
    fn test_validate() {
        assert!(QNetworkConfig::new(10, 10).validate().is_ok());
        assert!(QNetworkConfig::new(3, 10).validate().is_err());

        let config = QNetworkConfig {
            hidden_dims: [0, 16],
            ..QNetworkConfig::new(10, 10)
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gradient_flow() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new(10, 10).init::<TestAutodiffBackend>(&device);

        let observation = Tensor::ones([1, 3, 10, 10], &device).require_grad();
        let loss = network.forward(observation.clone()).sum();
        let gradients = loss.backward();

        let grad: TensorData = observation
            .grad(&gradients)
            .expect("input should receive gradients")
            .into_data();
        let grad_abs: f32 = grad.as_slice::<f32>().unwrap().iter().map(|g| g.abs()).sum();
        assert!(grad_abs > 1e-9, "gradients should be non-zero");
    }

    #[test]
    fn test_batch_consistency() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new(10, 10).init::<TestBackend>(&device);

        let single = Tensor::random([1, 3, 10, 10], Distribution::Uniform(0.0, 1.0), &device);
        let batch = Tensor::cat(vec![single.clone(), single.clone(), single.clone()], 0);

        let single_q = network.forward(single).into_data().to_vec::<f32>().unwrap();
        let batch_q = network.forward(batch).into_data().to_vec::<f32>().unwrap();

        for (a, b) in single_q.iter().zip(&batch_q[..4]) {
            assert!((a - b).abs() < 1e-5);
        }
        assert!(batch_q.iter().all(|v| v.is_finite()));
    }
}
