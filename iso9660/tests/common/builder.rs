use crate::common::MemoryBlockDevice;

const SECTOR: usize = 2048;
const PVD_LBA: u32 = 16;
const ROOT_LBA: u32 = 20;
const CATALOG_LBA: u32 = 21;
/// Nested directory level `n` (1-based) lives at `DIR_BASE + n - 1`
const DIR_BASE: u32 = 22;
const FILE_BASE: u32 = 40;

/// Bytes that pass the El Torito s390 compatibility check
pub fn s390_image(len: usize) -> Vec<u8> {
    let mut image = vec![0u8; len.max(32)];
    image[8..32].copy_from_slice(&iso9660::boot::LINUX_S390_MAGIC);
    image
}

struct FileSpec {
    name: String,
    content: Vec<u8>,
    depth: usize,
    recorded_len: Option<u32>,
}

struct BootSpec {
    file: usize,
    sector_count: u16,
    load_segment: u16,
    unused: u8,
}

/// Builds small ISO images with an optional El Torito catalog
///
/// Layout: PVD at 16, boot record at 17 (when enabled), terminator after
/// it, root directory at 20, catalog at 21, one directory per nesting
/// level from 22, file data from 40.
pub struct IsoBuilder {
    files: Vec<FileSpec>,
    boot: Vec<BootSpec>,
    el_torito: bool,
    platform: u8,
}

impl IsoBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            boot: Vec::new(),
            el_torito: false,
            platform: 0,
        }
    }

    /// Add a file in the root directory, returning its index
    pub fn add_file(&mut self, name: &str, content: &[u8]) -> usize {
        self.add_nested_file(0, name, content)
    }

    /// Add a file `depth` directories below the root
    pub fn add_nested_file(&mut self, depth: usize, name: &str, content: &[u8]) -> usize {
        self.files.push(FileSpec {
            name: name.to_string(),
            content: content.to_vec(),
            depth,
            recorded_len: None,
        });
        self.files.len() - 1
    }

    /// Override the length written in the file's directory record
    pub fn set_recorded_len(&mut self, file: usize, len: u32) {
        self.files[file].recorded_len = Some(len);
    }

    /// Add a bootable catalog entry for `file`
    pub fn add_boot_entry(&mut self, file: usize, sector_count: u16, load_segment: u16) {
        self.el_torito = true;
        self.boot.push(BootSpec {
            file,
            sector_count,
            load_segment,
            unused: 0,
        });
    }

    /// Set the reserved byte of the most recent boot entry
    pub fn corrupt_last_entry_unused(&mut self) {
        if let Some(entry) = self.boot.last_mut() {
            entry.unused = 1;
        }
    }

    /// Emit the boot record descriptor even with no entries
    pub fn with_el_torito(&mut self) {
        self.el_torito = true;
    }

    pub fn platform(&mut self, id: u8) {
        self.platform = id;
    }

    /// Sector where file `index` will be placed
    pub fn file_lba(&self, index: usize) -> u32 {
        let mut lba = FILE_BASE;
        for file in &self.files[..index] {
            lba += file.content.len().div_ceil(SECTOR).max(1) as u32;
        }
        lba
    }

    pub fn build(&self) -> MemoryBlockDevice {
        let end = self.file_lba(self.files.len());
        let mut data = vec![0u8; (end as usize + 1) * SECTOR];

        // Primary volume descriptor
        let pvd = PVD_LBA as usize * SECTOR;
        Self::descriptor_header(&mut data[pvd..], 1);
        data[pvd + 40..pvd + 51].copy_from_slice(b"TEST VOLUME");
        Self::write_both_endian_u32(&mut data[pvd + 80..], end + 1);
        Self::write_both_endian_u16(&mut data[pvd + 128..], 2048);
        let mut root_record = pvd + 156;
        Self::write_dir_entry(&mut data, &mut root_record, ROOT_LBA, 2048, 0x02, &[0]);

        // Boot record and terminator
        let mut next = PVD_LBA + 1;
        if self.el_torito {
            let br = next as usize * SECTOR;
            Self::descriptor_header(&mut data[br..], 0);
            data[br + 7..br + 30].copy_from_slice(b"EL TORITO SPECIFICATION");
            data[br + 71..br + 75].copy_from_slice(&CATALOG_LBA.to_le_bytes());
            next += 1;
        }
        Self::descriptor_header(&mut data[next as usize * SECTOR..], 255);

        // Directories
        let max_depth = self.files.iter().map(|f| f.depth).max().unwrap_or(0);
        for level in 0..=max_depth {
            let lba = Self::dir_lba(level);
            let parent = if level == 0 { ROOT_LBA } else { Self::dir_lba(level - 1) };
            let mut offset = lba as usize * SECTOR;
            Self::write_dir_entry(&mut data, &mut offset, lba, 2048, 0x02, &[0]);
            Self::write_dir_entry(&mut data, &mut offset, parent, 2048, 0x02, &[1]);
            for (index, file) in self.files.iter().enumerate().filter(|(_, f)| f.depth == level) {
                let len = file.recorded_len.unwrap_or(file.content.len() as u32);
                let name = format!("{};1", file.name);
                Self::write_dir_entry(&mut data, &mut offset, self.file_lba(index), len, 0, name.as_bytes());
            }
            if level < max_depth {
                let name = format!("D{}", level + 1);
                Self::write_dir_entry(&mut data, &mut offset, Self::dir_lba(level + 1), 2048, 0x02, name.as_bytes());
            }
        }

        // File contents
        for (index, file) in self.files.iter().enumerate() {
            let start = self.file_lba(index) as usize * SECTOR;
            data[start..start + file.content.len()].copy_from_slice(&file.content);
        }

        // Boot catalog
        if self.el_torito {
            let cat = CATALOG_LBA as usize * SECTOR;
            data[cat] = 1;
            data[cat + 1] = self.platform;
            data[cat + 30] = 0x55;
            data[cat + 31] = 0xAA;
            for (i, entry) in self.boot.iter().enumerate() {
                let e = cat + 32 * (i + 1);
                data[e] = 0x88;
                data[e + 2..e + 4].copy_from_slice(&entry.load_segment.to_le_bytes());
                data[e + 5] = entry.unused;
                data[e + 6..e + 8].copy_from_slice(&entry.sector_count.to_le_bytes());
                data[e + 8..e + 12].copy_from_slice(&self.file_lba(entry.file).to_le_bytes());
            }
        }

        MemoryBlockDevice::new(data)
    }

    fn dir_lba(level: usize) -> u32 {
        if level == 0 {
            ROOT_LBA
        } else {
            DIR_BASE + level as u32 - 1
        }
    }

    fn descriptor_header(dst: &mut [u8], type_code: u8) {
        dst[0] = type_code;
        dst[1..6].copy_from_slice(b"CD001");
        dst[6] = 1;
    }

    fn write_both_endian_u32(dst: &mut [u8], value: u32) {
        dst[0..4].copy_from_slice(&value.to_le_bytes());
        dst[4..8].copy_from_slice(&value.to_be_bytes());
    }

    fn write_both_endian_u16(dst: &mut [u8], value: u16) {
        dst[0..2].copy_from_slice(&value.to_le_bytes());
        dst[2..4].copy_from_slice(&value.to_be_bytes());
    }

    fn write_dir_entry(data: &mut [u8], offset: &mut usize, lba: u32, size: u32, flags: u8, name: &[u8]) {
        let mut entry_len = 33 + name.len();
        if entry_len % 2 != 0 {
            entry_len += 1; // Padding to even
        }

        let start = *offset;
        data[start] = entry_len as u8;
        Self::write_both_endian_u32(&mut data[start + 2..], lba);
        Self::write_both_endian_u32(&mut data[start + 10..], size);
        data[start + 25] = flags;
        data[start + 32] = name.len() as u8;
        data[start + 33..start + 33 + name.len()].copy_from_slice(name);

        *offset += entry_len;
    }
}
