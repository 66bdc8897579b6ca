use crate::{ReadError, Routine, Template, WorkoutSummary};

pub trait DashboardService {
    fn get_dashboard(&self) -> Result<Dashboard, ReadError>;
}

/// Overview of active and recent training.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub in_progress: Vec<WorkoutSummary>,
    /// The most recent finished workouts, at most `Dashboard::RECENT_WORKOUTS`.
    pub recent: Vec<WorkoutSummary>,
    pub templates: Vec<Template>,
    pub routines: Vec<Routine>,
}

impl Dashboard {
    pub const RECENT_WORKOUTS: usize = 5;
}
