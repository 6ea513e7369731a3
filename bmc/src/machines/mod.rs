//! Build, host, and target machine descriptions
//!
//! Cross compilation distinguishes the machine doing the build, the machine
//! the output runs on, and (for compilers) the machine the output targets.
//! Values fall back along the chain target → host → build.

/// One of the three machines involved in a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Machine {
    Build,
    Host,
    Target,
}

impl Machine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Machine::Build => "build",
            Machine::Host => "host",
            Machine::Target => "target",
        }
    }
}

/// Operating system kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Linux,
    Darwin,
    Windows,
}

/// Byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endian::Little => "little",
            Endian::Big => "big",
        }
    }
}

/// Information about one machine
#[derive(Debug, Clone, PartialEq)]
pub struct MachineInfo {
    pub machine: Machine,
    pub kernel: Kernel,
    pub endian: Endian,
    pub cpu_family: String,
    pub cpu: String,
}

impl MachineInfo {
    /// cpu defaults to the family name
    pub fn new(machine: Machine, kernel: Kernel, endian: Endian, cpu_family: &str) -> Self {
        Self {
            machine,
            kernel,
            endian,
            cpu_family: cpu_family.to_string(),
            cpu: cpu_family.to_string(),
        }
    }

    /// Lower-cased kernel name, e.g. "linux"
    pub fn system(&self) -> &'static str {
        match self.kernel {
            Kernel::Linux => "linux",
            Kernel::Darwin => "darwin",
            Kernel::Windows => "windows",
        }
    }
}

/// A value for each of the three machines, with fallback
///
/// The build value is always present; host falls back to build, and target
/// falls back to host then build.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerMachine<T> {
    build: T,
    host: Option<T>,
    target: Option<T>,
}

impl<T> PerMachine<T> {
    pub fn new(build: T) -> Self {
        Self {
            build,
            host: None,
            target: None,
        }
    }

    pub fn with_host(mut self, host: T) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_target(mut self, target: T) -> Self {
        self.target = Some(target);
        self
    }

    pub fn set_host(&mut self, host: T) {
        self.host = Some(host);
    }

    pub fn set_target(&mut self, target: T) {
        self.target = Some(target);
    }

    /// Value for a machine, following the fallback chain
    pub fn get(&self, machine: Machine) -> &T {
        match machine {
            Machine::Build => &self.build,
            Machine::Host => self.host.as_ref().unwrap_or(&self.build),
            Machine::Target => self
                .target
                .as_ref()
                .or(self.host.as_ref())
                .unwrap_or(&self.build),
        }
    }

    /// Which machine's slot actually supplies the value for `machine`
    pub fn resolve(&self, machine: Machine) -> Machine {
        match machine {
            Machine::Build => Machine::Build,
            Machine::Host => {
                if self.host.is_some() {
                    Machine::Host
                } else {
                    Machine::Build
                }
            }
            Machine::Target => {
                if self.target.is_some() {
                    Machine::Target
                } else if self.host.is_some() {
                    Machine::Host
                } else {
                    Machine::Build
                }
            }
        }
    }

    pub fn build(&self) -> &T {
        &self.build
    }

    pub fn host(&self) -> &T {
        self.get(Machine::Host)
    }

    pub fn target(&self) -> &T {
        self.get(Machine::Target)
    }

    /// The populated slots, in build/host/target order
    pub fn explicit(&self) -> Vec<(Machine, &T)> {
        let mut slots = vec![(Machine::Build, &self.build)];
        if let Some(host) = &self.host {
            slots.push((Machine::Host, host));
        }
        if let Some(target) = &self.target {
            slots.push((Machine::Target, target));
        }
        slots
    }
}

/// Detect the build machine from compile-time constants
pub fn detect_build() -> MachineInfo {
    let kernel = match std::env::consts::OS {
        "macos" => Kernel::Darwin,
        "windows" => Kernel::Windows,
        _ => Kernel::Linux,
    };
    let endian = if cfg!(target_endian = "big") {
        Endian::Big
    } else {
        Endian::Little
    };
    MachineInfo::new(Machine::Build, kernel, endian, std::env::consts::ARCH)
}
