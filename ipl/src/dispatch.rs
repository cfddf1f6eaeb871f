//! Boot scheme selection
//!
//! The order in which boot record layouts are tried is a static plan: a
//! list of [`Step`]s, each naming a scheme, the condition under which it
//! runs and what a corrupt record or a failed load means for the rest of
//! the plan. [`Dispatcher::boot`] walks the plan until a scheme produces an
//! entry point.
//!
//! Policy violations always end the IPL, and so do I/O errors except while
//! a list-directed script is loading. A missing signature moves on to the
//! next step.

use alloc::vec::Vec;
use core::convert::Infallible;
use core::fmt;

use gpt_disk_io::BlockIo;

use crate::bootmap::eckd::{self, LdlFlavor, LABEL_BLOCK};
use crate::bootmap::scsi;
use crate::config::BootConfig;
use crate::disk::{DeviceKind, Disk, Scratch, ISO_BLOCK_SIZE};
use crate::ebcdic;
use crate::error::{BootError, Result};
use crate::iso::{self, ISO_SIGNATURE_OFFSET};
use crate::machine::Machine;
use crate::script::{self, BootScript, EntryPoint};

/// A boot record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// zIPL MBR on a SCSI disk
    ScsiMbr,
    /// El Torito catalog on ISO9660 media
    ElTorito,
    /// ECKD list-directed boot record
    ListDirected,
    /// ECKD compatible disk layout
    Cdl,
    /// ECKD CMS-formatted minidisk
    Cms,
    /// ECKD Linux disk layout
    Ldl,
    /// ECKD Linux disk layout without a label
    Unlabeled,
}

impl Scheme {
    /// Schemes that address the disk through CHS pointers
    pub fn is_eckd(self) -> bool {
        !matches!(self, Self::ScsiMbr | Self::ElTorito)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ScsiMbr => "SCSI MBR",
            Self::ElTorito => "El Torito",
            Self::ListDirected => "ECKD list-directed",
            Self::Cdl => "ECKD CDL",
            Self::Cms => "ECKD CMS",
            Self::Ldl => "ECKD LDL",
            Self::Unlabeled => "ECKD unlabeled",
        };
        f.write_str(name)
    }
}

/// Key of the label in block 2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// `VOL1`
    Vol1,
    /// `LNX1`
    Lnx1,
    /// `CMS1`
    Cms1,
    /// Anything else, including an all-zero key
    Unknown,
}

/// The volume label as far as scheme selection cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeLabel {
    /// Label key
    pub kind: LabelKind,
}

impl VolumeLabel {
    /// Classify the label block by its key
    pub fn parse(raw: &[u8]) -> Self {
        let kind = match raw.get(..4) {
            Some(key) if key == ebcdic::VOL1_MAGIC => LabelKind::Vol1,
            Some(key) if key == ebcdic::LNX1_MAGIC => LabelKind::Lnx1,
            Some(key) if key == ebcdic::CMS1_MAGIC => LabelKind::Cms1,
            _ => LabelKind::Unknown,
        };
        Self { kind }
    }
}

/// When a step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Unconditionally
    Always,
    /// 2048-byte blocks, or `CD001` where the first volume descriptor sits
    IsoCandidate,
    /// Block 2 carries this label
    Label(LabelKind),
    /// No earlier step tried this scheme
    Untried(Scheme),
}

/// What a failure of a given kind means for the rest of the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// End the IPL with the error
    Stop,
    /// Try the next step
    Continue,
    /// Try the next step, even after an I/O error
    Retry,
}

/// One entry of a boot plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Scheme to try
    pub scheme: Scheme,
    /// Condition for trying it
    pub when: Predicate,
    /// Reaction to a corrupt boot record
    pub on_malformed: OnFailure,
    /// Reaction to a failure while loading the parsed script
    pub on_exec_failure: OnFailure,
}

impl Step {
    const fn new(scheme: Scheme, when: Predicate, on_malformed: OnFailure, on_exec_failure: OnFailure) -> Self {
        Self {
            scheme,
            when,
            on_malformed,
            on_exec_failure,
        }
    }
}

use OnFailure::{Continue, Retry, Stop};

/// Plan for CD-ROM devices
pub const CDROM_PLAN: &[Step] = &[Step::new(Scheme::ElTorito, Predicate::Always, Stop, Stop)];

/// Plan for disk devices
///
/// Only one of the label-keyed ECKD steps runs. Whatever it reports, the
/// final CDL step follows, which covers volumes whose records have zero
/// keys.
pub const DISK_PLAN: &[Step] = &[
    Step::new(Scheme::ScsiMbr, Predicate::Always, Stop, Stop),
    Step::new(Scheme::ElTorito, Predicate::IsoCandidate, Continue, Continue),
    Step::new(Scheme::ListDirected, Predicate::Always, Continue, Retry),
    Step::new(Scheme::Cdl, Predicate::Label(LabelKind::Vol1), Continue, Stop),
    Step::new(Scheme::Cms, Predicate::Label(LabelKind::Cms1), Continue, Stop),
    Step::new(Scheme::Ldl, Predicate::Label(LabelKind::Lnx1), Continue, Stop),
    Step::new(Scheme::Unlabeled, Predicate::Label(LabelKind::Unknown), Continue, Stop),
    Step::new(Scheme::Cdl, Predicate::Untried(Scheme::Cdl), Continue, Stop),
];

/// Everything one IPL attempt works with
pub struct Session<B: BlockIo, M: Machine> {
    /// Boot device
    pub disk: Disk<B>,
    /// Guest machine
    pub machine: M,
    /// Loadparm and menu settings
    pub config: BootConfig,
    /// Sector buffers shared by every scheme
    pub scratch: Scratch,
}

/// Runs a boot plan against a session
pub struct Dispatcher<B: BlockIo, M: Machine> {
    session: Session<B, M>,
    attempted: Vec<Scheme>,
    label: Option<VolumeLabel>,
}

impl<B: BlockIo, M: Machine> Dispatcher<B, M> {
    /// Set up a session for `disk`
    pub fn new(disk: Disk<B>, machine: M, config: BootConfig) -> Self {
        Self {
            session: Session {
                disk,
                machine,
                config,
                scratch: Scratch::new(),
            },
            attempted: Vec::new(),
            label: None,
        }
    }

    /// Plan matching the device kind
    pub fn plan(&self) -> &'static [Step] {
        match self.session.disk.kind() {
            DeviceKind::Cdrom => CDROM_PLAN,
            DeviceKind::Block | DeviceKind::Scsi => DISK_PLAN,
        }
    }

    /// Schemes tried so far, in order
    pub fn attempted(&self) -> &[Scheme] {
        &self.attempted
    }

    /// The session
    pub fn session(&self) -> &Session<B, M> {
        &self.session
    }

    /// Give the session back
    pub fn into_session(self) -> Session<B, M> {
        self.session
    }

    /// Walk the plan and load the first bootable program
    ///
    /// Returns the entry point without transferring control. When every
    /// scheme is rejected, the last rejection is returned.
    pub fn boot(&mut self) -> Result<EntryPoint> {
        self.attempted.clear();
        self.label = None;
        let mut last = BootError::NotApplicable("no bootable scheme on device");

        for step in self.plan() {
            if step.scheme.is_eckd() {
                self.session.disk.ensure_eckd_geometry();
            }
            if !self.applies(step.when)? {
                log::debug!("skipping {}", step.scheme);
                continue;
            }
            self.attempted.push(step.scheme);

            let script = match self.build(step.scheme) {
                Ok(script) => script,
                Err(err) => {
                    self.settle(step.scheme, err, step.on_malformed)?;
                    last = err;
                    continue;
                }
            };

            let Session {
                disk,
                machine,
                scratch,
                ..
            } = &mut self.session;
            match script::load(&script, disk, machine, scratch) {
                Ok(entry) => {
                    log::info!("booting via {}", step.scheme);
                    return Ok(entry);
                }
                Err(err) => {
                    self.settle(step.scheme, err, step.on_exec_failure)?;
                    last = err;
                }
            }
        }

        log::error!("no boot record found on device");
        Err(last)
    }

    /// Decide whether `err` ends the plan
    fn settle(&self, scheme: Scheme, err: BootError, policy: OnFailure) -> Result<()> {
        match (err, policy) {
            (BootError::Io(_), Retry) => {
                log::warn!("{} failed, retrying as CCW IPL: {}", scheme, err);
                Ok(())
            }
            _ if err.is_fatal() => {
                log::error!("{}: {}", scheme, err);
                Err(err)
            }
            (BootError::Malformed(_), Stop) => {
                log::error!("{}: {}", scheme, err);
                Err(err)
            }
            (BootError::Malformed(_), _) => {
                log::warn!("{} rejected: {}", scheme, err);
                Ok(())
            }
            _ => {
                log::info!("{} rejected: {}", scheme, err);
                Ok(())
            }
        }
    }

    fn applies(&mut self, when: Predicate) -> Result<bool> {
        Ok(match when {
            Predicate::Always => true,
            Predicate::IsoCandidate => self.is_iso_candidate()?,
            Predicate::Label(kind) => self.label()?.kind == kind,
            Predicate::Untried(scheme) => !self.attempted.contains(&scheme),
        })
    }

    fn is_iso_candidate(&mut self) -> Result<bool> {
        let disk = &mut self.session.disk;
        if disk.block_size() == ISO_BLOCK_SIZE {
            return Ok(true);
        }
        let geometry = disk.geometry();
        let capacity = geometry.total_blocks.saturating_mul(geometry.block_size as u64);
        let mut magic = [0u8; 5];
        if capacity < ISO_SIGNATURE_OFFSET + magic.len() as u64 {
            return Ok(false);
        }
        disk.read_at(ISO_SIGNATURE_OFFSET, &mut magic)?;
        Ok(&magic == b"CD001")
    }

    fn label(&mut self) -> Result<VolumeLabel> {
        if let Some(label) = self.label {
            return Ok(label);
        }
        let Session { disk, scratch, .. } = &mut self.session;
        disk.read_block(LABEL_BLOCK, &mut scratch.sec, "volume label")?;
        let label = VolumeLabel::parse(&scratch.sec);
        log::debug!("volume label {:?}", label.kind);
        self.label = Some(label);
        Ok(label)
    }

    fn build(&mut self, scheme: Scheme) -> Result<BootScript> {
        let Session {
            disk,
            machine,
            config,
            scratch,
        } = &mut self.session;
        let map = match scheme {
            Scheme::ScsiMbr => return scsi::parse(disk, machine, config, scratch),
            Scheme::ElTorito => return iso::parse(disk, machine, config, scratch),
            Scheme::ListDirected => eckd::find_list_directed_bmt(disk, scratch)?,
            Scheme::Cdl => eckd::parse_cdl(disk, scratch)?,
            Scheme::Cms => eckd::parse_ldl(disk, scratch, LdlFlavor::Cms)?,
            Scheme::Ldl => eckd::parse_ldl(disk, scratch, LdlFlavor::Ldl)?,
            Scheme::Unlabeled => eckd::parse_ldl(disk, scratch, LdlFlavor::Unlabeled)?,
        };
        eckd::build_script(disk, machine, config, scratch, &map)
    }
}

/// Boot from `disk` and hand control to the loaded program
///
/// Only returns on failure.
pub fn ipl<B: BlockIo, M: Machine>(disk: Disk<B>, machine: M, config: BootConfig) -> Result<Infallible> {
    let mut dispatcher = Dispatcher::new(disk, machine, config);
    let entry = dispatcher.boot()?;
    dispatcher.session.machine.transfer_control(entry)
}
