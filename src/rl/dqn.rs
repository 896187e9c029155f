//! Experience-replay Deep Q-Learning agent
//!
//! The policy network lives on the autodiff backend and is the only thing
//! gradient descent touches. The target network lives on the inner backend,
//! supplies bootstrap values, and is only ever replaced wholesale by a copy of
//! the policy in [`DqnAgent::update_target`].

use std::fs;
use std::path::{Path, PathBuf};

use burn::{
    grad_clipping::GradientClippingConfig,
    module::{AutodiffModule, Module},
    nn::loss::{HuberLoss, HuberLossConfig, Reduction},
    optim::{AdamW, AdamWConfig, GradientsParams, Optimizer, adaptor::OptimizerAdaptor},
    tensor::{Int, Tensor, backend::{AutodiffBackend, Backend}},
};
use tracing::{debug, info, warn};

use super::agent::Agent;
use super::config::DqnConfig;
use super::exploration::{EpsilonGreedy, argmax};
use super::network::{QNetwork, QNetworkConfig};
use super::persistence::{CHECKPOINT_VERSION, Checkpoint, decode_record, encode_record};
use super::replay_buffer::{NextState, ReplayBuffer, Transition};
use crate::error::{CheckpointError, ConfigError, EstimatorError, TrainingError};
use crate::metrics::TrainingMetrics;

type PolicyOptimizer<B> = OptimizerAdaptor<AdamW, QNetwork<B>, B>;
type PolicyRecord<B> = <QNetwork<B> as Module<B>>::Record;
type OptimizerRecord<B> = <PolicyOptimizer<B> as Optimizer<QNetwork<B>, B>>::Record;

/// Errors beyond this switch from quadratic to linear loss
const HUBER_DELTA: f32 = 1.0;

/// DQN agent: policy and target networks, replay memory, AdamW and an
/// epsilon-greedy schedule.
pub struct DqnAgent<B: AutodiffBackend> {
    policy: QNetwork<B>,
    target: QNetwork<B::InnerBackend>,
    optimizer: PolicyOptimizer<B>,
    loss: HuberLoss,
    memory: ReplayBuffer<Transition<B::InnerBackend>>,
    exploration: EpsilonGreedy,
    metrics: TrainingMetrics,
    config: DqnConfig,
    network_config: QNetworkConfig,
    model_name_prefix: String,
    metrics_dir: Option<PathBuf>,
    device: B::Device,
}

impl<B: AutodiffBackend> DqnAgent<B> {
    /// Build an agent with freshly initialised networks; the target starts as
    /// a copy of the policy.
    pub fn new(
        config: DqnConfig,
        network_config: QNetworkConfig,
        device: B::Device,
    ) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::Validation)?;
        network_config
            .validate()
            .map_err(ConfigError::Validation)?;
        if network_config.num_actions != config.num_actions {
            return Err(ConfigError::Validation(format!(
                "network outputs {} actions but the agent expects {}",
                network_config.num_actions, config.num_actions
            )));
        }

        let policy = network_config.init::<B>(&device);
        let target = policy.valid();
        let optimizer = Self::build_optimizer(&config);

        let memory = match config.seed {
            Some(seed) => ReplayBuffer::with_seed(config.replay_capacity, seed),
            None => ReplayBuffer::new(config.replay_capacity),
        };
        let exploration = EpsilonGreedy::new(
            config.epsilon_start,
            config.epsilon_end,
            config.epsilon_decay,
            config.exploitation_threshold,
            config.num_actions,
            config.seed.map(|s| s.wrapping_add(1)),
        );

        Ok(Self {
            policy,
            target,
            optimizer,
            loss: HuberLossConfig::new(HUBER_DELTA).init(),
            memory,
            exploration,
            metrics: TrainingMetrics::default(),
            config,
            network_config,
            model_name_prefix: "dqn".to_string(),
            metrics_dir: None,
            device,
        })
    }

    /// Prefix of checkpoint file names
    pub fn with_model_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.model_name_prefix = prefix.into();
        self
    }

    /// Directory for `metrics.csv` and the detailed JSON dumps.
    /// Defaults to the checkpoint directory.
    pub fn with_metrics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.metrics_dir = Some(dir.into());
        self
    }

    fn build_optimizer(config: &DqnConfig) -> PolicyOptimizer<B> {
        AdamWConfig::new()
            .with_grad_clipping(Some(GradientClippingConfig::Value(config.clip_gradients)))
            .init()
    }

    /// Epsilon-greedy action for `state`; never fails
    pub fn select_action(&mut self, state: &Tensor<B::InnerBackend, 3>, episode: usize) -> usize {
        let policy = &self.policy;
        let expected = self.network_config.input_shape();
        let action = self
            .exploration
            .select_action(episode, || greedy_action(&policy.valid(), state, expected));
        debug!(
            episode,
            action,
            epsilon = self.exploration.epsilon(),
            steps_done = self.exploration.steps_done(),
            "selected action"
        );
        action
    }

    /// Store the transition, then run one optimization step.
    ///
    /// # Arguments
    ///
    /// * `state` - Observation the action was taken in
    /// * `action` - Index of the action taken
    /// * `reward` - Reward received for the step
    /// * `next_state` - Observation after the step
    /// * `done` - Marks `next_state` as terminal; it is then never bootstrapped
    ///
    /// # Returns
    ///
    /// The loss of the update, or `None` while the memory holds less than one
    /// batch. A state whose shape does not match the network input is rejected
    /// with [`TrainingError::TransitionShape`] and not stored.
    pub fn on_step(
        &mut self,
        state: Tensor<B::InnerBackend, 3>,
        action: usize,
        reward: f32,
        next_state: Tensor<B::InnerBackend, 3>,
        done: bool,
    ) -> Result<Option<f32>, TrainingError> {
        let expected = self.network_config.input_shape();
        for actual in [state.dims(), next_state.dims()] {
            if actual != expected {
                return Err(TrainingError::TransitionShape { expected, actual });
            }
        }

        let next_state = if done {
            NextState::Terminal
        } else {
            NextState::Continuing(next_state)
        };
        self.memory.push(Transition {
            state,
            action,
            next_state,
            reward,
        });
        self.optimize_model()
    }

    /// One TD update on a batch sampled from replay memory.
    ///
    /// Targets are `reward + gamma * max_a target(next_state)`, with terminal
    /// transitions bootstrapping zero. The Huber loss between the policy's
    /// Q-value for the taken action and that target is back-propagated,
    /// gradients are clipped element-wise and AdamW takes one step.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - fewer than `batch_size` transitions are stored
    /// * `Ok(Some(loss))` - the update ran; loss and epsilon are recorded
    /// * `Err(_)` - the loss was non-finite or tensor data could not be read
    ///
    /// # Example
    ///
    /// ```rust
    /// use snake_dqn::rl::{default_device, DqnAgent, DqnConfig, QNetworkConfig, TrainingBackend};
    ///
    /// let mut agent = DqnAgent::<TrainingBackend>::new(
    ///     DqnConfig::default(),
    ///     QNetworkConfig::new(8, 8),
    ///     default_device(),
    /// )?;
    /// // Nothing to learn from yet
    /// assert_eq!(agent.optimize_model()?, None);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn optimize_model(&mut self) -> Result<Option<f32>, TrainingError> {
        if self.memory.len() < self.config.batch_size {
            return Ok(None);
        }
        let batch = self.memory.sample(self.config.batch_size)?;
        self.update_on_batch(batch).map(Some)
    }

    /// Gradient step on a given batch
    fn update_on_batch(
        &mut self,
        batch: Vec<Transition<B::InnerBackend>>,
    ) -> Result<f32, TrainingError> {
        let batch_size = batch.len();
        let targets = self.td_targets(&batch)?;

        let mut states = Vec::with_capacity(batch_size);
        let mut actions = Vec::with_capacity(batch_size);
        for transition in batch {
            states.push(transition.state);
            actions.push(transition.action as i64);
        }

        let state_batch: Tensor<B::InnerBackend, 4> = Tensor::stack(states, 0);
        let state_batch = Tensor::<B, 4>::from_inner(state_batch);
        let action_idx = Tensor::<B, 1, Int>::from_ints(actions.as_slice(), &self.device)
            .reshape([batch_size, 1]);
        let q_pred = self.policy.forward(state_batch).gather(1, action_idx);
        let q_target = Tensor::<B, 1>::from_floats(targets.as_slice(), &self.device)
            .reshape([batch_size, 1]);

        let loss = self.loss.forward(q_pred, q_target, Reduction::Mean);
        let loss_value = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| TrainingError::Readback(format!("{:?}", e)))?
            .first()
            .copied()
            .unwrap_or(f32::NAN);
        if !loss_value.is_finite() {
            return Err(TrainingError::NonFiniteLoss(loss_value));
        }

        // Gradient elements are clipped by the optimizer before the step
        let grads = GradientsParams::from_grads(loss.backward(), &self.policy);
        self.policy = self
            .optimizer
            .step(self.config.learning_rate, self.policy.clone(), grads);

        self.metrics
            .record_update(loss_value, self.exploration.epsilon());
        Ok(loss_value)
    }

    /// Bellman targets for `batch`, bootstrapped from the target network
    fn td_targets(
        &self,
        batch: &[Transition<B::InnerBackend>],
    ) -> Result<Vec<f32>, TrainingError> {
        let mut continuing_idx = Vec::new();
        let mut continuing_states = Vec::new();
        for (i, transition) in batch.iter().enumerate() {
            if let NextState::Continuing(next) = &transition.next_state {
                continuing_idx.push(i);
                continuing_states.push(next.clone());
            }
        }

        // Terminal entries stay 0
        let mut next_values = vec![0.0f32; batch.len()];
        if !continuing_states.is_empty() {
            let next_batch: Tensor<B::InnerBackend, 4> = Tensor::stack(continuing_states, 0);
            let max_q = self
                .target
                .forward(next_batch)
                .max_dim(1)
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| TrainingError::Readback(format!("{:?}", e)))?;
            for (&i, value) in continuing_idx.iter().zip(max_q) {
                next_values[i] = value;
            }
        }

        let rewards: Vec<f32> = batch.iter().map(|t| t.reward).collect();
        Ok(bellman_targets(&rewards, &next_values, self.config.gamma))
    }

    /// Overwrite the target network with the current policy
    pub fn update_target(&mut self) {
        self.target = self.policy.valid();
    }

    /// Sync the target every `target_update_frequency` episodes
    pub fn on_episode_end(&mut self, episode: usize) {
        if episode % self.config.target_update_frequency == 0 {
            self.update_target();
            info!(episode, "target network synchronized");
        }
    }

    pub fn record_episode(&mut self, reward: f32, length: usize) {
        self.metrics.record_episode(reward, length);
    }

    /// Write `<prefix>_episode_<N>.ckpt` into `dir` and flush metrics
    ///
    /// The checkpoint holds the policy, target and optimizer records, the
    /// exploration state and the full training history. Alongside it a row is
    /// appended to `metrics.csv` and the raw history is dumped to
    /// `detailed_metrics_episode_<N>.json`, both in the metrics directory.
    ///
    /// # Arguments
    ///
    /// * `dir` - Checkpoint directory, created if missing
    /// * `episode` - Episode number stored in the file and its name
    ///
    /// # Returns
    ///
    /// Path of the written checkpoint
    pub fn save(&self, dir: &Path, episode: usize) -> Result<PathBuf, CheckpointError> {
        fs::create_dir_all(dir)?;

        let checkpoint = Checkpoint {
            version: CHECKPOINT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            episode,
            network: self.network_config.clone(),
            policy: encode_record::<B, _>("policy", self.policy.clone().into_record())?,
            target: encode_record::<B::InnerBackend, _>(
                "target",
                self.target.clone().into_record(),
            )?,
            optimizer: encode_record::<B, _>("optimizer", self.optimizer.to_record())?,
            steps_done: self.exploration.steps_done(),
            epsilon: self.exploration.epsilon(),
            training_metrics: self.metrics.clone(),
        };
        let path = dir.join(Checkpoint::file_name(&self.model_name_prefix, episode));
        checkpoint.write(&path)?;

        let metrics_dir = self.metrics_dir.as_deref().unwrap_or(dir);
        fs::create_dir_all(metrics_dir)?;
        self.metrics
            .summary(
                episode,
                self.exploration.epsilon(),
                self.config.loss_window,
                self.config.reward_window,
            )
            .append_to(&metrics_dir.join("metrics.csv"))?;
        self.metrics.write_json(
            &metrics_dir.join(format!("detailed_metrics_episode_{}.json", episode)),
        )?;

        info!(episode, path = %path.display(), "checkpoint saved");
        Ok(path)
    }

    /// Restore from `path` and return the saved episode.
    ///
    /// # Returns
    ///
    /// * `Ok(episode)` - networks, optimizer, schedule and metrics restored
    /// * `Ok(0)` - no file at `path`; the agent is untouched
    /// * `Err(_)` - unreadable, wrong version, other board or corrupt record.
    ///   Nothing is overwritten unless every component decodes.
    pub fn load(&mut self, path: &Path) -> Result<usize, CheckpointError> {
        if !path.exists() {
            warn!(path = %path.display(), "no checkpoint found, starting from scratch");
            return Ok(0);
        }

        let checkpoint = Checkpoint::read(path)?;
        if checkpoint.network != self.network_config {
            return Err(CheckpointError::Incompatible(format!(
                "saved network {:?} differs from {:?}",
                checkpoint.network, self.network_config
            )));
        }

        let policy_record: PolicyRecord<B> =
            decode_record::<B, _>("policy", checkpoint.policy, &self.device)?;
        let target_record: PolicyRecord<B::InnerBackend> =
            decode_record::<B::InnerBackend, _>("target", checkpoint.target, &self.device)?;
        let optimizer_record: OptimizerRecord<B> =
            decode_record::<B, _>("optimizer", checkpoint.optimizer, &self.device)?;

        self.policy = self
            .network_config
            .init::<B>(&self.device)
            .load_record(policy_record);
        self.target = self
            .network_config
            .init::<B::InnerBackend>(&self.device)
            .load_record(target_record);
        self.optimizer = Self::build_optimizer(&self.config).load_record(optimizer_record);
        self.exploration
            .restore(checkpoint.epsilon, checkpoint.steps_done);
        self.metrics = checkpoint.training_metrics;

        info!(
            episode = checkpoint.episode,
            steps_done = checkpoint.steps_done,
            epsilon = checkpoint.epsilon,
            "checkpoint loaded"
        );
        Ok(checkpoint.episode)
    }

    pub fn policy(&self) -> &QNetwork<B> {
        &self.policy
    }

    pub fn target(&self) -> &QNetwork<B::InnerBackend> {
        &self.target
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon()
    }

    pub fn steps_done(&self) -> u64 {
        self.exploration.steps_done()
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn network_config(&self) -> &QNetworkConfig {
        &self.network_config
    }
}

impl<B: AutodiffBackend> Agent<B::InnerBackend> for DqnAgent<B> {
    fn name(&self) -> &str {
        "dqn"
    }

    fn select_action(&mut self, state: &Tensor<B::InnerBackend, 3>, episode: usize) -> usize {
        DqnAgent::select_action(self, state, episode)
    }

    fn on_step(
        &mut self,
        state: Tensor<B::InnerBackend, 3>,
        action: usize,
        reward: f32,
        next_state: Tensor<B::InnerBackend, 3>,
        done: bool,
    ) -> Result<Option<f32>, TrainingError> {
        DqnAgent::on_step(self, state, action, reward, next_state, done)
    }

    fn on_episode_end(&mut self, episode: usize) {
        DqnAgent::on_episode_end(self, episode)
    }

    fn record_episode(&mut self, reward: f32, length: usize) {
        DqnAgent::record_episode(self, reward, length)
    }

    fn epsilon(&self) -> Option<f32> {
        Some(DqnAgent::epsilon(self))
    }

    fn save(&self, dir: &Path, episode: usize) -> Result<Option<PathBuf>, CheckpointError> {
        DqnAgent::save(self, dir, episode).map(Some)
    }

    fn load(&mut self, path: &Path) -> Result<usize, CheckpointError> {
        DqnAgent::load(self, path)
    }
}

/// Greedy action of `network` for a single observation
fn greedy_action<B: Backend>(
    network: &QNetwork<B>,
    state: &Tensor<B, 3>,
    expected: [usize; 3],
) -> Result<usize, EstimatorError> {
    let actual = state.dims();
    if actual != expected {
        return Err(EstimatorError::ShapeMismatch { expected, actual });
    }
    let q_values = network
        .forward(state.clone().unsqueeze_dim(0))
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| EstimatorError::Readback(format!("{:?}", e)))?;
    argmax(&q_values)
}

/// `reward + gamma * next_value` per transition
pub(crate) fn bellman_targets(rewards: &[f32], next_values: &[f32], gamma: f32) -> Vec<f32> {
    rewards
        .iter()
        .zip(next_values)
        .map(|(reward, value)| reward + gamma * value)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::{InferenceBackend, TrainingBackend, default_device};
    use burn::tensor::Distribution;
    use tempfile::TempDir;

    type TestAgent = DqnAgent<TrainingBackend>;

    fn test_config() -> DqnConfig {
        DqnConfig {
            learning_rate: 1e-3,
            batch_size: 32,
            replay_capacity: 256,
            target_update_frequency: 5,
            seed: Some(17),
            ..Default::default()
        }
    }

    fn agent(config: DqnConfig) -> TestAgent {
        DqnAgent::new(config, QNetworkConfig::new(8, 8), default_device()).unwrap()
    }

    fn observation() -> Tensor<InferenceBackend, 3> {
        Tensor::random([3, 8, 8], Distribution::Uniform(0.0, 1.0), &default_device())
    }

    fn fill(agent: &mut TestAgent, n: usize) -> Vec<Option<f32>> {
        (0..n)
            .map(|i| {
                agent
                    .on_step(observation(), i % 4, 1.0 - (i % 3) as f32, observation(), i % 7 == 0)
                    .unwrap()
            })
            .collect()
    }

    fn policy_bytes(agent: &TestAgent) -> Vec<u8> {
        encode_record::<InferenceBackend, _>("policy", agent.policy().valid().into_record()).unwrap()
    }

    fn target_bytes(agent: &TestAgent) -> Vec<u8> {
        encode_record::<InferenceBackend, _>("target", agent.target().clone().into_record()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = DqnConfig {
            gamma: 2.0,
            ..Default::default()
        };
        let result = DqnAgent::<TrainingBackend>::new(config, QNetworkConfig::new(8, 8), default_device());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_target_starts_as_policy_copy() {
        let agent = agent(test_config());
        assert_eq!(policy_bytes(&agent), target_bytes(&agent));
    }

    #[test]
    fn test_no_update_below_batch_size() {
        let mut agent = agent(test_config());

        let losses = fill(&mut agent, 10);

        assert!(losses.iter().all(Option::is_none));
        assert_eq!(agent.memory_len(), 10);
        assert_eq!(agent.optimize_model().unwrap(), None);
        assert!(agent.metrics().losses.is_empty());
    }

    #[test]
    fn test_update_returns_finite_loss() {
        let mut agent = agent(test_config());
        fill(&mut agent, 31);

        let loss = fill(&mut agent, 1)[0].expect("a full batch is stored");

        assert!(loss.is_finite());
        assert!(loss >= 0.0);
        assert_eq!(agent.metrics().losses, vec![loss]);
        assert_eq!(agent.metrics().epsilon_values.len(), 1);
    }

    #[test]
    fn test_optimize_leaves_target_untouched() {
        let mut agent = agent(test_config());
        fill(&mut agent, 40);
        agent.update_target();
        let target_before = target_bytes(&agent);
        let policy_before = policy_bytes(&agent);

        for _ in 0..3 {
            agent.optimize_model().unwrap();
        }

        assert_eq!(target_bytes(&agent), target_before);
        assert_ne!(policy_bytes(&agent), policy_before);
    }

    #[test]
    fn test_update_target_copies_policy() {
        let mut agent = agent(test_config());
        fill(&mut agent, 40);
        assert_ne!(policy_bytes(&agent), target_bytes(&agent));

        agent.update_target();

        assert_eq!(policy_bytes(&agent), target_bytes(&agent));
    }

    #[test]
    fn test_episode_end_syncs_on_cadence() {
        let mut agent = agent(test_config());
        fill(&mut agent, 40);

        agent.on_episode_end(4);
        assert_ne!(policy_bytes(&agent), target_bytes(&agent));

        agent.on_episode_end(5);
        assert_eq!(policy_bytes(&agent), target_bytes(&agent));
    }

    #[test]
    fn test_select_action_in_range() {
        let mut agent = agent(test_config());
        for episode in [1, 2, 500, 5_000] {
            for _ in 0..5 {
                assert!(agent.select_action(&observation(), episode) < 4);
            }
        }
        assert_eq!(agent.steps_done(), 20);
        // Past the threshold the agent is fully greedy
        assert_eq!(agent.epsilon(), 0.0);
    }

    #[test]
    fn test_malformed_state_falls_back_to_random() {
        let mut agent = agent(test_config());
        let wrong = Tensor::<InferenceBackend, 3>::zeros([3, 5, 5], &default_device());

        for _ in 0..20 {
            assert!(agent.select_action(&wrong, 5_000) < 4);
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut original = agent(test_config());
        fill(&mut original, 40);
        for episode in 1..=50 {
            original.select_action(&observation(), episode);
            original.record_episode(episode as f32, episode);
        }

        let path = original.save(dir.path(), 50).unwrap();
        assert_eq!(path, dir.path().join("dqn_episode_50.ckpt"));

        let mut restored = agent(DqnConfig {
            seed: Some(99),
            ..test_config()
        });
        let episode = restored.load(&path).unwrap();

        assert_eq!(episode, 50);
        assert_eq!(restored.steps_done(), original.steps_done());
        assert_eq!(restored.epsilon(), original.epsilon());
        assert_eq!(restored.metrics(), original.metrics());
        assert_eq!(policy_bytes(&restored), policy_bytes(&original));
        assert_eq!(target_bytes(&restored), target_bytes(&original));

        // Same batch through both optimizers must land on the same weights
        let batch: Vec<_> = (0..8)
            .map(|i| Transition {
                state: observation(),
                action: i % 4,
                next_state: if i % 3 == 0 {
                    NextState::Terminal
                } else {
                    NextState::Continuing(observation())
                },
                reward: i as f32 - 3.0,
            })
            .collect();

        let mut fresh_optimizer = agent(test_config());
        fresh_optimizer.load(&path).unwrap();
        fresh_optimizer.optimizer = TestAgent::build_optimizer(&test_config());

        original.update_on_batch(batch.clone()).unwrap();
        restored.update_on_batch(batch.clone()).unwrap();
        fresh_optimizer.update_on_batch(batch).unwrap();

        assert_eq!(policy_bytes(&restored), policy_bytes(&original));
        assert_ne!(policy_bytes(&fresh_optimizer), policy_bytes(&original));
    }

    #[test]
    fn test_save_writes_metrics() {
        let dir = TempDir::new().unwrap();
        let metrics_dir = dir.path().join("run");
        let mut agent = agent(test_config())
            .with_model_name_prefix("snake")
            .with_metrics_dir(&metrics_dir);
        agent.record_episode(2.0, 15);

        let path = agent.save(&dir.path().join("models"), 1).unwrap();
        agent.save(&dir.path().join("models"), 2).unwrap();

        assert!(path.ends_with("snake_episode_1.ckpt"));
        let csv = fs::read_to_string(metrics_dir.join("metrics.csv")).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,NaN,2,15,"));
        assert!(metrics_dir.join("detailed_metrics_episode_2.json").exists());
    }

    #[test]
    fn test_load_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut agent = agent(test_config());
        let before = policy_bytes(&agent);

        let episode = agent.load(&dir.path().join("absent.ckpt")).unwrap();

        assert_eq!(episode, 0);
        assert_eq!(agent.steps_done(), 0);
        assert_eq!(policy_bytes(&agent), before);
    }

    #[test]
    fn test_corrupt_checkpoint_leaves_agent_intact() {
        let dir = TempDir::new().unwrap();
        let mut agent = agent(test_config());
        let before = policy_bytes(&agent);

        let garbage = dir.path().join("garbage.ckpt");
        fs::write(&garbage, vec![7u8; 64]).unwrap();
        assert!(agent.load(&garbage).is_err());

        // Valid container, corrupt policy blob
        let saved = agent.save(dir.path(), 3).unwrap();
        let mut checkpoint = Checkpoint::read(&saved).unwrap();
        checkpoint.policy.truncate(10);
        checkpoint.steps_done = 12345;
        checkpoint.write(&saved).unwrap();

        assert!(matches!(
            agent.load(&saved),
            Err(CheckpointError::RecordDecode { component: "policy", .. })
        ));
        assert_eq!(agent.steps_done(), 0);
        assert_eq!(policy_bytes(&agent), before);
    }

    #[test]
    fn test_rejects_checkpoint_for_other_board() {
        let dir = TempDir::new().unwrap();
        let small = agent(test_config());
        let path = small.save(dir.path(), 1).unwrap();

        let mut large =
            DqnAgent::<TrainingBackend>::new(test_config(), QNetworkConfig::new(12, 12), default_device())
                .unwrap();

        assert!(matches!(
            large.load(&path),
            Err(CheckpointError::Incompatible(_))
        ));
    }

    #[test]
    fn test_huber_loss_values() {
        let device = default_device();
        let agent = agent(test_config());
        let prediction =
            Tensor::<InferenceBackend, 2>::from_floats([[0.0], [3.0], [-2.0], [0.3]], &device);
        let target =
            Tensor::<InferenceBackend, 2>::from_floats([[0.5], [0.0], [1.0], [0.2]], &device);

        let loss = agent
            .loss
            .forward(prediction, target, Reduction::Mean)
            .into_data()
            .to_vec::<f32>()
            .unwrap()[0];

        // 0.125 + 2.5 + 2.5 + 0.005, averaged
        assert!((loss - 1.2825).abs() < 1e-5);
    }

    #[test]
    fn test_bellman_targets() {
        let targets = bellman_targets(&[1.0, -10.0, 0.5], &[2.0, 0.0, -1.0], 0.9);
        assert_eq!(targets.len(), 3);
        assert!((targets[0] - 2.8).abs() < 1e-6);
        assert_eq!(targets[1], -10.0);
        assert!((targets[2] + 0.4).abs() < 1e-6);
    }

    fn max_q(network_output: Tensor<InferenceBackend, 2>) -> f32 {
        network_output
            .into_data()
            .to_vec::<f32>()
            .unwrap()
            .into_iter()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    #[test]
    fn test_td_targets_bootstrap_from_target_network() {
        let mut agent = agent(test_config());
        fill(&mut agent, 40);
        for _ in 0..3 {
            agent.optimize_model().unwrap();
        }
        let next = observation();
        let batch = vec![
            Transition {
                state: observation(),
                action: 0,
                next_state: NextState::Terminal,
                reward: -10.0,
            },
            Transition {
                state: observation(),
                action: 2,
                next_state: NextState::Continuing(next.clone()),
                reward: 0.5,
            },
        ];

        let targets = agent.td_targets(&batch).unwrap();

        let target_max = max_q(agent.target().forward(next.clone().unsqueeze_dim(0)));
        let policy_max = max_q(agent.policy().valid().forward(next.unsqueeze_dim(0)));
        let gamma = agent.config().gamma;

        assert_eq!(targets[0], -10.0);
        assert!((targets[1] - (0.5 + gamma * target_max)).abs() < 1e-5);
        // Bootstrapping from the policy would give a different value
        assert!((targets[1] - (0.5 + gamma * policy_max)).abs() > 1e-6);
    }

    #[test]
    fn test_rejects_misshapen_transition() {
        let mut agent = agent(test_config());
        let wrong = Tensor::<InferenceBackend, 3>::zeros([3, 5, 5], &default_device());

        let result = agent.on_step(wrong.clone(), 1, 0.0, observation(), false);
        assert!(matches!(
            result,
            Err(TrainingError::TransitionShape {
                expected: [3, 8, 8],
                actual: [3, 5, 5],
            })
        ));
        assert!(agent.on_step(observation(), 1, 0.0, wrong, true).is_err());
        assert_eq!(agent.memory_len(), 0);
    }
}
