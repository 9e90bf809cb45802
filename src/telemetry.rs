use std::path::Path;

/// One reading from the climate logger's file: temperature, CO2, humidity,
/// one value per line in that order. Read fresh before every annotation,
/// never cached.
#[derive(Debug, Clone)]
pub struct TelemetryReading {
    pub temperature: String,
    pub co2_ppm: u32,
    pub humidity: String,
}

impl TelemetryReading {
    /// Read the first three lines of the telemetry file. Fails if the file
    /// is missing, has fewer than three lines, or the CO2 line is not an
    /// integer; there is no partial result.
    pub fn read(path: &Path) -> Result<Self, TelemetryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TelemetryError::Read(path.display().to_string(), e))?;

        let mut lines = content.lines();
        let (Some(temperature), Some(co2), Some(humidity)) =
            (lines.next(), lines.next(), lines.next())
        else {
            return Err(TelemetryError::Truncated {
                got: content.lines().count(),
            });
        };

        let co2_ppm = co2
            .trim()
            .parse()
            .map_err(|_| TelemetryError::BadCo2(co2.trim().to_string()))?;

        Ok(Self {
            temperature: temperature.trim_end().to_string(),
            co2_ppm,
            humidity: humidity.trim_end().to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to read telemetry file {0}: {1}")]
    Read(String, std::io::Error),
    #[error("telemetry file has {got} lines, expected at least 3")]
    Truncated { got: usize },
    #[error("CO2 line is not an integer ppm value: {0:?}")]
    BadCo2(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tmp(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("roomcam-telemetry-{}-{name}", std::process::id()))
    }

    #[test]
    fn reads_three_lines_in_order() {
        let path = tmp("ok");
        std::fs::write(&path, "21.4\n867\n38.2\n").unwrap();

        let reading = TelemetryReading::read(&path).unwrap();
        assert_eq!(reading.temperature, "21.4");
        assert_eq!(reading.co2_ppm, 867);
        assert_eq!(reading.humidity, "38.2");
    }

    #[test]
    fn strips_trailing_whitespace() {
        let path = tmp("whitespace");
        std::fs::write(&path, "21.4 \r\n867\r\n38.2\r\n").unwrap();

        let reading = TelemetryReading::read(&path).unwrap();
        assert_eq!(reading.temperature, "21.4");
        assert_eq!(reading.humidity, "38.2");
    }

    #[test]
    fn extra_lines_are_ignored() {
        let path = tmp("extra");
        std::fs::write(&path, "21.4\n867\n38.2\n1013\n").unwrap();

        let reading = TelemetryReading::read(&path).unwrap();
        assert_eq!(reading.co2_ppm, 867);
    }

    #[test]
    fn two_lines_is_truncated() {
        let path = tmp("short");
        std::fs::write(&path, "21.4\n867\n").unwrap();

        match TelemetryReading::read(&path) {
            Err(TelemetryError::Truncated { got }) => assert_eq!(got, 2),
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = tmp("missing-never-written");
        assert!(matches!(
            TelemetryReading::read(&path),
            Err(TelemetryError::Read(_, _))
        ));
    }

    #[test]
    fn non_integer_co2_is_rejected() {
        let path = tmp("badco2");
        std::fs::write(&path, "21.4\nlots\n38.2\n").unwrap();

        assert!(matches!(
            TelemetryReading::read(&path),
            Err(TelemetryError::BadCo2(_))
        ));
    }
}
