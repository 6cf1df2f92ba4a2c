/// Running `Σ value·dt`, hard limited to `±limit`.
pub struct Integrator {
    current_value: f32,
    limit: f32,
}

impl Integrator {
    pub fn new(limit: f32) -> Self {
        Integrator {
            current_value: 0.0_f32,
            limit,
        }
    }

    pub fn add_new_value(&mut self, value: f32, interval_seconds: f32) {
        self.current_value += value * interval_seconds;
        self.current_value = self.current_value.clamp(-self.limit, self.limit);
    }

    pub fn get_current_value(&self) -> f32 {
        self.current_value
    }

    pub fn limit(&self) -> f32 {
        self.limit
    }

    pub fn set_limit(&mut self, limit: f32) {
        self.limit = limit;
        self.current_value = self.current_value.clamp(-limit, limit);
    }

    pub fn reset(&mut self) {
        self.current_value = 0.0_f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::value_close;

    #[test]
    fn accumulates_and_clamps() {
        let mut integrator = Integrator::new(1.0);
        integrator.add_new_value(2.0, 0.25);
        assert!(value_close(integrator.get_current_value(), 0.5));
        integrator.add_new_value(10.0, 1.0);
        assert!(value_close(integrator.get_current_value(), 1.0));
        integrator.add_new_value(-10.0, 1.0);
        assert!(value_close(integrator.get_current_value(), -1.0));
    }

    #[test]
    fn tightening_the_limit_clamps_the_value() {
        let mut integrator = Integrator::new(1.0);
        integrator.add_new_value(0.8, 1.0);
        integrator.set_limit(0.5);
        assert!(value_close(integrator.get_current_value(), 0.5));
        integrator.reset();
        assert_eq!(integrator.get_current_value(), 0.0);
    }
}
