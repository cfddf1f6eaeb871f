//! Disk image builders for the supported boot record layouts

use ccw_ipl::ebcdic;
use ccw_ipl::geometry::DeviceGeometry;
use ccw_ipl::BlockNumber;

use crate::common::MemoryBlockDevice;

const FILL: u8 = 0xAA;

/// One entry of a boot map script or component table
#[derive(Debug, Clone, Copy)]
pub enum ScriptEntry {
    /// Load the chain whose first pointer array is at `array`
    Load { array: u64, address: u64 },
    Signature,
    Exec(u64),
    /// Any other type byte
    Kind(u8),
}

fn write_script(block: &mut [u8], entries: &[ScriptEntry], pointer: impl Fn(u64) -> [u8; 16]) {
    block.fill(0);
    block[..4].copy_from_slice(b"zIPL");
    for (i, entry) in entries.iter().enumerate() {
        let e = &mut block[32 + 32 * i..64 + 32 * i];
        let (kind, address, array) = match *entry {
            ScriptEntry::Load { array, address } => (2, address, Some(array)),
            ScriptEntry::Signature => (3, 0, None),
            ScriptEntry::Exec(psw) => (1, psw, None),
            ScriptEntry::Kind(kind) => (kind, 0, None),
        };
        if let Some(array) = array {
            e[..16].copy_from_slice(&pointer(array));
        }
        e[23] = kind;
        e[24..32].copy_from_slice(&address.to_be_bytes());
    }
}

/// 4K-formatted DASD image with the guessed geometry (15 heads, 12 records)
pub struct EckdImage {
    pub data: Vec<u8>,
}

impl EckdImage {
    pub const BLOCK: usize = 4096;

    pub fn new(blocks: usize) -> Self {
        Self {
            data: vec![0u8; blocks * Self::BLOCK],
        }
    }

    pub fn geometry() -> DeviceGeometry {
        DeviceGeometry::guessed(Self::BLOCK as u32, 0)
    }

    pub fn chs(block: u64) -> [u8; 5] {
        Self::geometry()
            .block_to_chs(BlockNumber(block))
            .expect("encodable block")
            .to_bytes()
    }

    /// Extended ECKD pointer to `extra + 1` blocks at `block`
    pub fn pointer(block: u64, extra: u8) -> [u8; 16] {
        let mut raw = [0u8; 16];
        raw[..5].copy_from_slice(&Self::chs(block));
        raw[5..7].copy_from_slice(&(Self::BLOCK as u16).to_be_bytes());
        raw[7] = extra;
        raw
    }

    pub fn block_mut(&mut self, block: u64) -> &mut [u8] {
        let start = block as usize * Self::BLOCK;
        &mut self.data[start..start + Self::BLOCK]
    }

    /// CDL: `IPL2` record in block 1 and a `VOL1` label in block 2
    pub fn cdl(&mut self, bmt: u64) -> &mut Self {
        let ipl2 = self.block_mut(1);
        ipl2[..4].copy_from_slice(&ebcdic::IPL2_MAGIC);
        ipl2[92..96].copy_from_slice(b"zIPL");
        ipl2[98] = 0;
        ipl2[100..116].copy_from_slice(&Self::pointer(bmt, 0));
        let label = self.block_mut(2);
        label[..4].copy_from_slice(&ebcdic::VOL1_MAGIC);
        label[4..8].copy_from_slice(&ebcdic::VOL1_MAGIC);
        // "0X0200"
        label[8..14].copy_from_slice(&[0xF0, 0xE7, 0xF0, 0xF2, 0xF0, 0xF0]);
        self
    }

    /// Stage 1b location for the zIPL menu, in the CDL `IPL2` record
    pub fn cdl_stage1b(&mut self, stage1b: u64) -> &mut Self {
        self.block_mut(1)[78..83].copy_from_slice(&Self::chs(stage1b));
        self
    }

    /// LDL/CMS/unlabeled: `BootInfo` in block 0
    pub fn boot_info(&mut self, bmt: u64) -> &mut Self {
        let ipl1 = self.block_mut(0);
        ipl1[..4].copy_from_slice(&ebcdic::IPL1_MAGIC);
        let bip = &mut ipl1[112..136];
        bip[..4].copy_from_slice(b"zIPL");
        bip[4] = 1;
        bip[5] = 0;
        bip[6] = 0;
        bip[7] = 1;
        bip[8..24].copy_from_slice(&Self::pointer(bmt, 0));
        self
    }

    /// A byte of the `BootInfo` record
    pub fn boot_info_byte(&mut self, offset: usize, value: u8) -> &mut Self {
        self.block_mut(0)[112 + offset] = value;
        self
    }

    /// `LNX1` or `CMS1` label in block 2
    pub fn label(&mut self, key: [u8; 4]) -> &mut Self {
        let label = self.block_mut(2);
        label[..4].copy_from_slice(&key);
        label[4..10].copy_from_slice(&[0xD3, 0xC9, 0xD5, 0xE4, 0xE7, 0x40]);
        label[79] = 0xF2;
        self
    }

    /// Point the label at a list-directed boot record
    pub fn list_directed(&mut self, record: u64, pgt: u64) -> &mut Self {
        self.block_mut(2)[78..83].copy_from_slice(&Self::chs(record));
        let record = self.block_mut(record);
        record.fill(0);
        record[..4].copy_from_slice(b"zIPL");
        record[4..8].copy_from_slice(&1u32.to_be_bytes());
        record[16..32].copy_from_slice(&Self::pointer(pgt, 0));
        self
    }

    /// Boot map table whose entry `i` points at `scripts[i]`
    pub fn bmt(&mut self, block: u64, scripts: &[u64]) -> &mut Self {
        let table = self.block_mut(block);
        table.fill(0);
        for (i, &script) in scripts.iter().enumerate() {
            table[16 * i..16 * i + 16].copy_from_slice(&Self::pointer(script, 0));
        }
        self
    }

    pub fn script(&mut self, block: u64, entries: &[ScriptEntry]) -> &mut Self {
        write_script(self.block_mut(block), entries, |array| Self::pointer(array, 0));
        self
    }

    /// Pointer array of `(block, extra)` runs, zero-terminated
    pub fn array(&mut self, block: u64, runs: &[(u64, u8)]) -> &mut Self {
        let array = self.block_mut(block);
        array.fill(0);
        for (i, &(run, extra)) in runs.iter().enumerate() {
            array[16 * i..16 * i + 16].copy_from_slice(&Self::pointer(run, extra));
        }
        self
    }

    /// Pointer array whose unused slots hold the fill byte
    ///
    /// In a CCW chain a zero-count pointer right before the fill continues
    /// the chain; list-directed chains end at the fill.
    pub fn filled_array(&mut self, block: u64, pointers: &[[u8; 16]]) -> &mut Self {
        let array = self.block_mut(block);
        array.fill(FILL);
        for (i, pointer) in pointers.iter().enumerate() {
            array[16 * i..16 * i + 16].copy_from_slice(pointer);
        }
        self
    }

    /// Stage 1b at `stage1b` listing `stage2`, with the menu text in the
    /// last of them
    pub fn zipl_menu(&mut self, stage1b: u64, stage2: &[u64], flag: u16, timeout_s: u16, text: &[u8]) -> &mut Self {
        let s1b = self.block_mut(stage1b);
        s1b.fill(0);
        for (i, &block) in stage2.iter().enumerate() {
            let seek = 768 + 8 * i;
            s1b[seek + 2..seek + 7].copy_from_slice(&Self::chs(block));
        }
        s1b[768 + 8 * stage2.len()..768 + 8 * stage2.len() + 8].fill(FILL);

        let last = *stage2.last().expect("stage 2 blocks");
        let menu = self.block_mut(last);
        menu.fill(0);
        let banner = 512;
        menu[banner - 140..banner - 138].copy_from_slice(&flag.to_be_bytes());
        menu[banner - 138..banner - 136].copy_from_slice(&timeout_s.to_be_bytes());
        menu[banner..banner + text.len()].copy_from_slice(text);
        self
    }

    /// Recognizable payload in `blocks` blocks from `block`
    pub fn payload(&mut self, block: u64, blocks: u64, tag: u8) -> &mut Self {
        for b in block..block + blocks {
            let data = self.block_mut(b);
            data.fill(tag);
            data[..8].copy_from_slice(&b.to_be_bytes());
        }
        self
    }

    pub fn device(&self) -> MemoryBlockDevice {
        MemoryBlockDevice::new(self.data.clone(), Self::BLOCK)
    }
}

/// EBCDIC zIPL menu text: banner, then one string per entry
pub fn zipl_menu_text(entries: &[&str]) -> Vec<u8> {
    let mut text = ebcdic::ZIPL_MAGIC.to_vec();
    text.push(0);
    for entry in entries {
        for b in entry.bytes() {
            text.push(match b {
                b' ' => ebcdic::SPACE,
                b'0'..=b'9' => 0xF0 + (b - b'0'),
                _ => 0xC1,
            });
        }
        text.push(0);
    }
    text.push(0);
    text
}

/// SCSI disk with 512-byte blocks and a zIPL MBR
pub struct ScsiImage {
    pub data: Vec<u8>,
}

impl ScsiImage {
    pub const BLOCK: usize = 512;
    pub const PROGRAM_TABLE: u64 = 1;

    pub fn new(blocks: usize) -> Self {
        let mut image = Self {
            data: vec![0u8; blocks * Self::BLOCK],
        };
        let mbr = image.block_mut(0);
        mbr[..4].copy_from_slice(b"zIPL");
        mbr[4..8].copy_from_slice(&1u32.to_be_bytes());
        mbr[16..32].copy_from_slice(&Self::pointer(Self::PROGRAM_TABLE, 0));
        let table = image.block_mut(Self::PROGRAM_TABLE);
        table[..4].copy_from_slice(b"zIPL");
        image
    }

    pub fn pointer(block: u64, extra: u16) -> [u8; 16] {
        let mut raw = [0u8; 16];
        raw[..8].copy_from_slice(&block.to_be_bytes());
        raw[8..10].copy_from_slice(&(Self::BLOCK as u16).to_be_bytes());
        raw[10..12].copy_from_slice(&extra.to_be_bytes());
        raw
    }

    pub fn block_mut(&mut self, block: u64) -> &mut [u8] {
        let start = block as usize * Self::BLOCK;
        &mut self.data[start..start + Self::BLOCK]
    }

    /// Program table entry `index` names the component table at `block`
    pub fn entry(&mut self, index: usize, block: u64) -> &mut Self {
        let at = 16 + 16 * index;
        self.block_mut(Self::PROGRAM_TABLE)[at..at + 16].copy_from_slice(&Self::pointer(block, 0));
        self
    }

    pub fn component_table(&mut self, block: u64, entries: &[ScriptEntry]) -> &mut Self {
        write_script(self.block_mut(block), entries, |array| Self::pointer(array, 0));
        self
    }

    /// Pointer array of `(block, extra)` runs; the rest of the block is unused
    pub fn array(&mut self, block: u64, runs: &[(u64, u16)]) -> &mut Self {
        let array = self.block_mut(block);
        array.fill(0);
        for (i, &(run, extra)) in runs.iter().enumerate() {
            array[16 * i..16 * i + 16].copy_from_slice(&Self::pointer(run, extra));
        }
        self
    }

    pub fn payload(&mut self, block: u64, blocks: u64, tag: u8) -> &mut Self {
        for b in block..block + blocks {
            self.block_mut(b).fill(tag);
        }
        self
    }

    pub fn device(&self) -> MemoryBlockDevice {
        MemoryBlockDevice::new(self.data.clone(), Self::BLOCK)
    }
}

/// ISO9660 image with one file in the root directory
///
/// Layout: PVD at 16, boot record at 17 when enabled, terminator after it,
/// root directory at 20, catalog at 21, the file from 24.
pub struct IsoImage {
    pub data: Vec<u8>,
}

impl IsoImage {
    pub const SECTOR: usize = 2048;
    pub const FILE_LBA: u32 = 24;
    const CATALOG_LBA: u32 = 21;

    /// `file` is stored with its real length; `sector_count` is what the
    /// catalog claims in 512-byte units
    pub fn new(file: &[u8], boot: Option<(u16, u16)>) -> Self {
        let end = Self::FILE_LBA as usize + file.len().div_ceil(Self::SECTOR) + 8;
        let mut data = vec![0u8; end * Self::SECTOR];

        let pvd = 16 * Self::SECTOR;
        Self::header(&mut data[pvd..], 1);
        Self::both_u32(&mut data[pvd + 80..], end as u32);
        data[pvd + 128..pvd + 130].copy_from_slice(&2048u16.to_le_bytes());
        data[pvd + 130..pvd + 132].copy_from_slice(&2048u16.to_be_bytes());
        Self::record(&mut data[pvd + 156..], 20, 2048, 0x02, &[0]);

        let mut next = 17;
        if boot.is_some() {
            let br = next * Self::SECTOR;
            Self::header(&mut data[br..], 0);
            data[br + 7..br + 30].copy_from_slice(b"EL TORITO SPECIFICATION");
            data[br + 71..br + 75].copy_from_slice(&Self::CATALOG_LBA.to_le_bytes());
            next += 1;
        }
        Self::header(&mut data[next * Self::SECTOR..], 255);

        let root = 20 * Self::SECTOR;
        let mut at = root;
        at += Self::record(&mut data[at..], 20, 2048, 0x02, &[0]);
        at += Self::record(&mut data[at..], 20, 2048, 0x02, &[1]);
        Self::record(&mut data[at..], Self::FILE_LBA, file.len() as u32, 0, b"KERNEL.IMG;1");

        let start = Self::FILE_LBA as usize * Self::SECTOR;
        data[start..start + file.len()].copy_from_slice(file);

        if let Some((sector_count, load_segment)) = boot {
            let cat = Self::CATALOG_LBA as usize * Self::SECTOR;
            data[cat] = 1;
            data[cat + 30] = 0x55;
            data[cat + 31] = 0xAA;
            let e = cat + 32;
            data[e] = 0x88;
            data[e + 2..e + 4].copy_from_slice(&load_segment.to_le_bytes());
            data[e + 6..e + 8].copy_from_slice(&sector_count.to_le_bytes());
            data[e + 8..e + 12].copy_from_slice(&Self::FILE_LBA.to_le_bytes());
        }
        Self { data }
    }

    /// Point the file's directory record elsewhere so its size cannot be
    /// looked up
    pub fn hide_file(&mut self) {
        let record = 20 * Self::SECTOR + 68;
        Self::both_u32(&mut self.data[record + 2..], 99);
    }

    /// Move the boot entry's image start to `lba`
    pub fn relocate_boot(&mut self, lba: u32) {
        let e = Self::CATALOG_LBA as usize * Self::SECTOR + 32;
        self.data[e + 8..e + 12].copy_from_slice(&lba.to_le_bytes());
    }

    /// Device exposing the image in `block_size` blocks
    pub fn device(&self, block_size: usize) -> MemoryBlockDevice {
        MemoryBlockDevice::new(self.data.clone(), block_size)
    }

    fn header(dst: &mut [u8], type_code: u8) {
        dst[0] = type_code;
        dst[1..6].copy_from_slice(b"CD001");
        dst[6] = 1;
    }

    fn both_u32(dst: &mut [u8], value: u32) {
        dst[..4].copy_from_slice(&value.to_le_bytes());
        dst[4..8].copy_from_slice(&value.to_be_bytes());
    }

    fn record(dst: &mut [u8], lba: u32, size: u32, flags: u8, name: &[u8]) -> usize {
        let len = (33 + name.len() + 1) & !1;
        dst[0] = len as u8;
        Self::both_u32(&mut dst[2..], lba);
        Self::both_u32(&mut dst[10..], size);
        dst[25] = flags;
        dst[32] = name.len() as u8;
        dst[33..33 + name.len()].copy_from_slice(name);
        len
    }
}

/// Bytes that pass the El Torito s390 check, `len` long
pub fn s390_image(len: usize) -> Vec<u8> {
    let mut image = vec![0x5Au8; len.max(32)];
    image[..8].fill(0);
    image[8..32].copy_from_slice(&iso9660::boot::LINUX_S390_MAGIC);
    image
}
