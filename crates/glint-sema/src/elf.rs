// elf.rs
//
// Minimal ELF64 reader: just enough to pull a named section out of an
// object file carrying module metadata. The loader is the only caller.

use thiserror::Error;

pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ElfError {
    #[error("not an ELF file")]
    NotElf,
    #[error("ELF file is truncated or malformed")]
    Truncated,
    #[error("only little-endian ELF64 objects are supported")]
    Unsupported,
    #[error("no section named {0}")]
    SectionNotFound(String),
}

pub fn is_elf(blob: &[u8]) -> bool {
    blob.len() >= 4 && blob[..4] == ELF_MAGIC
}

/// Extract the contents of the section called `name`.
pub fn section_by_name(blob: &[u8], name: &str) -> Result<Vec<u8>, ElfError> {
    if !is_elf(blob) {
        return Err(ElfError::NotElf);
    }
    if blob.len() < 64 {
        return Err(ElfError::Truncated);
    }
    // EI_CLASS must be ELFCLASS64, EI_DATA must be ELFDATA2LSB.
    if blob[4] != 2 || blob[5] != 1 {
        return Err(ElfError::Unsupported);
    }

    let shoff = read_u64(blob, 0x28)? as usize;
    let shentsize = read_u16(blob, 0x3a)? as usize;
    let shnum = read_u16(blob, 0x3c)? as usize;
    let shstrndx = read_u16(blob, 0x3e)? as usize;
    if shentsize < 64 || shstrndx >= shnum {
        return Err(ElfError::Truncated);
    }

    let header = |index: usize| -> Result<(usize, usize, usize), ElfError> {
        let base = shoff + index * shentsize;
        let sh_name = read_u32(blob, base)? as usize;
        let sh_offset = read_u64(blob, base + 0x18)? as usize;
        let sh_size = read_u64(blob, base + 0x20)? as usize;
        Ok((sh_name, sh_offset, sh_size))
    };

    let (_, strtab_off, strtab_size) = header(shstrndx)?;
    let strtab = blob
        .get(strtab_off..strtab_off + strtab_size)
        .ok_or(ElfError::Truncated)?;

    for index in 0..shnum {
        let (sh_name, sh_offset, sh_size) = header(index)?;
        let section_name = strtab
            .get(sh_name..)
            .and_then(|rest| rest.split(|&b| b == 0).next())
            .ok_or(ElfError::Truncated)?;
        if section_name == name.as_bytes() {
            return blob
                .get(sh_offset..sh_offset + sh_size)
                .map(|s| s.to_vec())
                .ok_or(ElfError::Truncated);
        }
    }

    Err(ElfError::SectionNotFound(name.to_string()))
}

fn read_u16(blob: &[u8], at: usize) -> Result<u16, ElfError> {
    blob.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(ElfError::Truncated)
}

fn read_u32(blob: &[u8], at: usize) -> Result<u32, ElfError> {
    blob.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ElfError::Truncated)
}

fn read_u64(blob: &[u8], at: usize) -> Result<u64, ElfError> {
    blob.get(at..at + 8)
        .map(|b| u64::from_le_bytes(b.try_into().unwrap()))
        .ok_or(ElfError::Truncated)
}

/// Build a minimal relocatable ELF64 object holding `contents` in a section
/// called `section_name`. Used by the driver's `-o` path and by tests.
pub fn object_with_section(section_name: &str, contents: &[u8]) -> Vec<u8> {
    // Layout: ehdr | section contents | shstrtab | 3 section headers
    let mut shstrtab = vec![0u8]; // index 0 is the empty name
    let name_off = shstrtab.len();
    shstrtab.extend_from_slice(section_name.as_bytes());
    shstrtab.push(0);
    let shstrtab_name_off = shstrtab.len();
    shstrtab.extend_from_slice(b".shstrtab");
    shstrtab.push(0);

    let contents_off = 64usize;
    let shstrtab_off = contents_off + contents.len();
    let shoff = shstrtab_off + shstrtab.len();

    let mut out = Vec::new();
    // e_ident
    out.extend_from_slice(&ELF_MAGIC);
    out.push(2); // ELFCLASS64
    out.push(1); // ELFDATA2LSB
    out.push(1); // EV_CURRENT
    out.extend_from_slice(&[0; 9]);
    out.extend_from_slice(&1u16.to_le_bytes()); // e_type = ET_REL
    out.extend_from_slice(&0x3eu16.to_le_bytes()); // e_machine = EM_X86_64
    out.extend_from_slice(&1u32.to_le_bytes()); // e_version
    out.extend_from_slice(&0u64.to_le_bytes()); // e_entry
    out.extend_from_slice(&0u64.to_le_bytes()); // e_phoff
    out.extend_from_slice(&(shoff as u64).to_le_bytes()); // e_shoff
    out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    out.extend_from_slice(&64u16.to_le_bytes()); // e_ehsize
    out.extend_from_slice(&0u16.to_le_bytes()); // e_phentsize
    out.extend_from_slice(&0u16.to_le_bytes()); // e_phnum
    out.extend_from_slice(&64u16.to_le_bytes()); // e_shentsize
    out.extend_from_slice(&3u16.to_le_bytes()); // e_shnum
    out.extend_from_slice(&2u16.to_le_bytes()); // e_shstrndx
    debug_assert_eq!(out.len(), 64);

    out.extend_from_slice(contents);
    out.extend_from_slice(&shstrtab);

    let mut shdr = |name: u32, sh_type: u32, offset: u64, size: u64| {
        out.extend_from_slice(&name.to_le_bytes());
        out.extend_from_slice(&sh_type.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes()); // sh_flags
        out.extend_from_slice(&0u64.to_le_bytes()); // sh_addr
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // sh_link
        out.extend_from_slice(&0u32.to_le_bytes()); // sh_info
        out.extend_from_slice(&1u64.to_le_bytes()); // sh_addralign
        out.extend_from_slice(&0u64.to_le_bytes()); // sh_entsize
    };

    shdr(0, 0, 0, 0); // SHT_NULL
    shdr(
        name_off as u32,
        1, // SHT_PROGBITS
        contents_off as u64,
        contents.len() as u64,
    );
    shdr(
        shstrtab_name_off as u32,
        3, // SHT_STRTAB
        shstrtab_off as u64,
        shstrtab.len() as u64,
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_a_section() {
        let payload = b"\x01\xc0\xff\xeehello metadata";
        let object = object_with_section(".glint_metadata", payload);
        assert!(is_elf(&object));
        let section = section_by_name(&object, ".glint_metadata").unwrap();
        assert_eq!(section, payload);
    }

    #[test]
    fn missing_section_is_reported() {
        let object = object_with_section(".other", b"data");
        assert_eq!(
            section_by_name(&object, ".glint_metadata"),
            Err(ElfError::SectionNotFound(".glint_metadata".to_string()))
        );
    }

    #[test]
    fn non_elf_is_rejected() {
        assert_eq!(
            section_by_name(b"not an object", ".glint_metadata"),
            Err(ElfError::NotElf)
        );
        assert!(!is_elf(b"\x7fEL"));
    }
}
