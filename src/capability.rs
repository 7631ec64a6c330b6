use crate::config::QualityTier;

const DEFAULT_THREADS: usize = 4;
const DEFAULT_MEMORY_GB: f32 = 4.0;

/// Hardware facts used to pick the tier `auto` starts from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    pub threads: usize,
    pub memory_gb: f32,
    pub mobile: bool,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            memory_gb: DEFAULT_MEMORY_GB,
            mobile: false,
        }
    }
}

impl DeviceProfile {
    /// Probes the host. `PARTICLE_WAVE_THREADS`, `PARTICLE_WAVE_MEMORY_GB` and
    /// `PARTICLE_WAVE_MOBILE` override the detected values.
    pub fn detect() -> Self {
        let threads = env_usize("PARTICLE_WAVE_THREADS")
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(DEFAULT_THREADS);
        let memory_gb = env_f32("PARTICLE_WAVE_MEMORY_GB")
            .or_else(total_memory_gb)
            .unwrap_or(DEFAULT_MEMORY_GB);
        let mobile = env_bool("PARTICLE_WAVE_MOBILE").unwrap_or(false);

        Self {
            threads,
            memory_gb,
            mobile,
        }
    }

    pub fn auto_tier(&self) -> QualityTier {
        resolve_auto_tier(self)
    }
}

pub fn resolve_auto_tier(profile: &DeviceProfile) -> QualityTier {
    if profile.mobile || profile.threads <= 4 || profile.memory_gb <= 4.0 {
        return QualityTier::Performance;
    }
    if profile.threads >= 10 && profile.memory_gb >= 8.0 {
        return QualityTier::High;
    }
    QualityTier::Balanced
}

#[derive(Debug, Clone)]
pub struct CapabilityReport {
    pub profile: DeviceProfile,
    pub auto_tier: QualityTier,
    notes: Vec<String>,
}

impl CapabilityReport {
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn status_label(&self) -> String {
        format!(
            "threads={} mem={:.1}GB{} -> {}",
            self.profile.threads,
            self.profile.memory_gb,
            if self.profile.mobile { " mobile" } else { "" },
            self.auto_tier.label()
        )
    }
}

pub fn probe() -> CapabilityReport {
    report_for(DeviceProfile::detect())
}

pub fn report_for(profile: DeviceProfile) -> CapabilityReport {
    let auto_tier = resolve_auto_tier(&profile);
    let mut report = CapabilityReport {
        profile,
        auto_tier,
        notes: Vec::new(),
    };

    if profile.mobile {
        report.push_note("mobile device flagged; auto quality starts at the coarsest tier");
    } else if profile.threads <= 4 {
        report.push_note(format!(
            "{} hardware threads; auto quality starts at the coarsest tier",
            profile.threads
        ));
    } else if profile.memory_gb <= 4.0 {
        report.push_note(format!(
            "{:.1}GB memory; auto quality starts at the coarsest tier",
            profile.memory_gb
        ));
    }

    if report.notes.is_empty() {
        report.push_note(format!("auto quality starts at {}", auto_tier.label()));
    }

    report
}

fn total_memory_gb() -> Option<f32> {
    let text = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo_gb(&text)
}

fn parse_meminfo_gb(text: &str) -> Option<f32> {
    let line = text.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb = line
        .trim_start_matches("MemTotal:")
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse::<f64>()
        .ok()?;
    Some((kb / (1024.0 * 1024.0)) as f32)
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok()?.trim().parse().ok()
}

fn env_f32(name: &str) -> Option<f32> {
    let v: f32 = std::env::var(name).ok()?.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

fn env_bool(name: &str) -> Option<bool> {
    let v = std::env::var(name).ok()?;
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
