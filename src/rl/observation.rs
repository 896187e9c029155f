use burn::tensor::{Tensor, TensorData, backend::Backend};

use crate::game::{GameState, Position};

/// Number of planes in an encoded observation
pub const OBSERVATION_CHANNELS: usize = 3;

const BODY: usize = 0;
const HEAD: usize = 1;
const FOOD: usize = 2;

/// Encode the board as a `[3, height, width]` one-hot tensor
///
/// Channels:
/// - 0: snake body, head excluded
/// - 1: snake head
/// - 2: food (all zeros once the board is full)
pub fn create_observation<B: Backend>(state: &GameState, device: &B::Device) -> Tensor<B, 3> {
    let plane = state.grid_width * state.grid_height;
    let mut data = vec![0.0f32; OBSERVATION_CHANNELS * plane];

    let mut mark = |channel: usize, pos: Position| {
        if state.is_in_bounds(pos) {
            let idx = channel * plane + pos.y as usize * state.grid_width + pos.x as usize;
            data[idx] = 1.0;
        }
    };

    for (i, &pos) in state.snake.segments().enumerate() {
        mark(if i == 0 { HEAD } else { BODY }, pos);
    }
    if let Some(food) = state.food {
        mark(FOOD, food);
    }

    let tensor_data = TensorData::new(
        data,
        [OBSERVATION_CHANNELS, state.grid_height, state.grid_width],
    );
    Tensor::<B, 3>::from_data(tensor_data, device)
}

/// Shape every observation of a `width` x `height` board has
pub fn observation_shape(width: usize, height: usize) -> [usize; 3] {
    [OBSERVATION_CHANNELS, height, width]
}
