use crate::DiscreteAct;

/// One experience `(o_t, a_t, r_t, o_t+1, is_done_t)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<O> {
    /// State in which the action was taken.
    pub obs: O,

    /// Action taken.
    pub act: DiscreteAct,

    /// Reward received after the action.
    pub reward: f32,

    /// State after the action.
    pub next_obs: O,

    /// Flag denoting if the episode ended with this transition.
    pub is_done: bool,
}

impl<O> Transition<O> {
    /// Constructs a transition.
    pub fn new(obs: O, act: DiscreteAct, reward: f32, next_obs: O, is_done: bool) -> Self {
        Self {
            obs,
            act,
            reward,
            next_obs,
            is_done,
        }
    }
}
