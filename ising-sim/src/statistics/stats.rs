/// Running average of `v^power` over a scalar time series.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub count: usize,
    pub aggregate: f64,
    pub power: i32,
}

impl Statistics {
    pub fn new(power: i32) -> Self {
        Self {
            count: 0,
            aggregate: 0.0,
            power,
        }
    }

    pub fn update(&mut self, value: f64) {
        self.count += 1;
        self.aggregate += if self.power == 1 {
            value
        } else {
            value.powi(self.power)
        };
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.aggregate / self.count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moments() {
        let mut m1 = Statistics::new(1);
        let mut m2 = Statistics::new(2);
        let mut m4 = Statistics::new(4);
        for v in [1.0, -1.0, 0.5, -0.5] {
            m1.update(v);
            m2.update(v);
            m4.update(v);
        }
        assert_eq!(m1.count, 4);
        assert_eq!(m1.average(), 0.0);
        assert_eq!(m2.average(), (1.0 + 1.0 + 0.25 + 0.25) / 4.0);
        assert_eq!(m4.average(), (1.0 + 1.0 + 0.0625 + 0.0625) / 4.0);
    }

    #[test]
    fn test_empty_average_is_zero() {
        assert_eq!(Statistics::new(2).average(), 0.0);
    }
}
