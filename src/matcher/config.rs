//! Matcher configuration: the tuned constants governing candidate search,
//! the stay/change/undecided transition rule, and the wall-clock budget.

/// Configuration knobs for `Matcher`. Defaults reproduce the original
/// tuning; override individual fields with the `with_*` builders rather
/// than constructing the struct by hand so future fields don't break
/// existing callers.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// Assumed upper bound on GPS perpendicular error, in meters.
    pub max_gps_error_m: f64,
    /// Assumed upper bound on cartographic (map digitization) error, in meters.
    pub max_map_error_m: f64,
    /// Slack applied to the stay/change transition rule, in meters.
    pub diff_gps_error_m: f64,
    /// Treat edges as traversable in either direction (apparent-undirected view).
    pub map_one_way_fix: bool,
    /// Exclude the current edge itself when enumerating CHANGE successors.
    pub u_turn_on_oneway: bool,
    /// Allow an edge to be revisited; when `false`, already-visited edges are
    /// excluded from successor enumeration.
    pub loop_allowed: bool,
    /// Wall-clock budget, in seconds, for one `match_trajectory` call.
    pub max_running_time_s: f64,
    /// Below this speed (m/s), sample bearing is unreliable. This is a
    /// pass-through consumed by the upstream cleaning collaborator; the
    /// matcher does not reinterpret it, but carries it for callers that
    /// want to reason about bearing trustworthiness downstream.
    pub minspeed_bearing_mps: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_gps_error_m: 60.0,
            max_map_error_m: 40.0,
            diff_gps_error_m: 10.0,
            map_one_way_fix: true,
            u_turn_on_oneway: false,
            loop_allowed: true,
            max_running_time_s: 5.0,
            minspeed_bearing_mps: 1.0,
        }
    }
}

impl MatcherConfig {
    /// Combined search radius for candidate enumeration and the
    /// perpendicular-error feasibility check.
    pub fn search_radius_m(&self) -> f64 {
        self.max_gps_error_m + self.max_map_error_m
    }

    pub fn with_max_gps_error_m(mut self, v: f64) -> Self {
        self.max_gps_error_m = v;
        self
    }

    pub fn with_max_map_error_m(mut self, v: f64) -> Self {
        self.max_map_error_m = v;
        self
    }

    pub fn with_diff_gps_error_m(mut self, v: f64) -> Self {
        self.diff_gps_error_m = v;
        self
    }

    pub fn with_map_one_way_fix(mut self, v: bool) -> Self {
        self.map_one_way_fix = v;
        self
    }

    pub fn with_u_turn_on_oneway(mut self, v: bool) -> Self {
        self.u_turn_on_oneway = v;
        self
    }

    pub fn with_loop_allowed(mut self, v: bool) -> Self {
        self.loop_allowed = v;
        self
    }

    pub fn with_max_running_time_s(mut self, v: f64) -> Self {
        self.max_running_time_s = v;
        self
    }

    pub fn with_minspeed_bearing_mps(mut self, v: f64) -> Self {
        self.minspeed_bearing_mps = v;
        self
    }
}
