//! Common test utilities and helpers.
//!
//! Builders for synthetic import sections, resource trees, version blobs and
//! whole PE images, plus `object::write` helpers for ELF and Mach-O files.

#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

/// Creates a temporary file with the given content.
pub fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Deterministic pseudo-random bytes.
pub fn lcg_bytes(len: usize, seed: u32) -> Vec<u8> {
    let mut x = seed;
    (0..len)
        .map(|_| {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (x >> 16) as u8
        })
        .collect()
}

fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn pad_to(buf: &mut Vec<u8>, align: usize) {
    while buf.len() % align != 0 {
        buf.push(0);
    }
}

pub mod imports {
    use super::*;

    /// One thunk of an import lookup table
    #[derive(Debug, Clone)]
    pub enum Thunk {
        Name(&'static str),
        Ordinal(u32),
    }

    /// Section bytes holding an import directory at offset 0, for a section
    /// mapped at `base_rva`.
    pub fn build_import_section(dlls: &[(&str, Vec<Thunk>)], base_rva: u32, is_64bit: bool) -> Vec<u8> {
        let entry_size = if is_64bit { 8 } else { 4 };
        let mut buf = vec![0u8; (dlls.len() + 1) * 20];

        for (index, (dll, thunks)) in dlls.iter().enumerate() {
            let table = buf.len();
            buf.resize(table + (thunks.len() + 1) * entry_size, 0);

            for (i, thunk) in thunks.iter().enumerate() {
                let value: u64 = match thunk {
                    Thunk::Name(name) => {
                        pad_to(&mut buf, 2);
                        let hint = buf.len();
                        buf.extend_from_slice(&[0, 0]);
                        buf.extend_from_slice(name.as_bytes());
                        buf.push(0);
                        base_rva as u64 + hint as u64
                    }
                    Thunk::Ordinal(ord) => {
                        if is_64bit {
                            (1u64 << 63) | *ord as u64
                        } else {
                            (1u64 << 31) | *ord as u64
                        }
                    }
                };
                let slot = table + i * entry_size;
                if is_64bit {
                    put_u64(&mut buf, slot, value);
                } else {
                    put_u32(&mut buf, slot, value as u32);
                }
            }

            let name = buf.len();
            buf.extend_from_slice(dll.as_bytes());
            buf.push(0);

            let descriptor = index * 20;
            put_u32(&mut buf, descriptor, base_rva + table as u32);
            put_u32(&mut buf, descriptor + 12, base_rva + name as u32);
            put_u32(&mut buf, descriptor + 16, base_rva + table as u32);
        }
        buf
    }
}

pub mod resources {
    use super::*;

    /// A resource directory node
    #[derive(Debug, Clone)]
    pub enum ResNode {
        Dir(Vec<(u32, ResNode)>),
        Leaf(Vec<u8>),
    }

    enum Target {
        Dir(usize),
        Leaf(usize),
    }

    fn flatten(
        children: &[(u32, ResNode)],
        dirs: &mut Vec<Vec<(u32, Target)>>,
        leaves: &mut Vec<Vec<u8>>,
    ) -> usize {
        let index = dirs.len();
        dirs.push(Vec::new());
        let mut entries = Vec::new();
        for (id, child) in children {
            let target = match child {
                ResNode::Dir(grandchildren) => Target::Dir(flatten(grandchildren, dirs, leaves)),
                ResNode::Leaf(data) => {
                    leaves.push(data.clone());
                    Target::Leaf(leaves.len() - 1)
                }
            };
            entries.push((*id, target));
        }
        dirs[index] = entries;
        index
    }

    /// Serialize a tree of numeric-id entries into `.rsrc` bytes mapped at
    /// `virtual_address`.
    pub fn build_resource_section(root: &[(u32, ResNode)], virtual_address: u32) -> Vec<u8> {
        let mut dirs = Vec::new();
        let mut leaves = Vec::new();
        flatten(root, &mut dirs, &mut leaves);

        let mut dir_offsets = Vec::new();
        let mut offset = 0;
        for entries in &dirs {
            dir_offsets.push(offset);
            offset += 16 + 8 * entries.len();
        }
        let data_entries = offset;
        let mut blob = data_entries + 16 * leaves.len();
        let mut blob_offsets = Vec::new();
        for data in &leaves {
            blob = (blob + 3) & !3;
            blob_offsets.push(blob);
            blob += data.len();
        }

        let mut buf = vec![0u8; blob];
        for (index, entries) in dirs.iter().enumerate() {
            let at = dir_offsets[index];
            put_u16(&mut buf, at + 14, entries.len() as u16);
            for (i, (id, target)) in entries.iter().enumerate() {
                let entry = at + 16 + i * 8;
                put_u32(&mut buf, entry, *id);
                let value = match target {
                    Target::Dir(child) => 0x8000_0000 | dir_offsets[*child] as u32,
                    Target::Leaf(leaf) => (data_entries + 16 * leaf) as u32,
                };
                put_u32(&mut buf, entry + 4, value);
            }
        }
        for (leaf, data) in leaves.iter().enumerate() {
            let entry = data_entries + 16 * leaf;
            put_u32(&mut buf, entry, virtual_address + blob_offsets[leaf] as u32);
            put_u32(&mut buf, entry + 4, data.len() as u32);
            buf[blob_offsets[leaf]..blob_offsets[leaf] + data.len()].copy_from_slice(data);
        }
        buf
    }

    /// type -> id 1 -> language -> data, for each `(type, language, data)`.
    pub fn simple_tree(items: &[(u32, u32, Vec<u8>)]) -> Vec<(u32, ResNode)> {
        items
            .iter()
            .map(|(rtype, language, data)| {
                (
                    *rtype,
                    ResNode::Dir(vec![(1, ResNode::Dir(vec![(*language, ResNode::Leaf(data.clone()))]))]),
                )
            })
            .collect()
    }
}

pub mod version {
    use super::*;

    fn utf16z(s: &str) -> Vec<u8> {
        s.encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(|u| u.to_le_bytes())
            .collect()
    }

    fn block(key: &str, value_len: u16, value_type: u16, value: &[u8], children: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; 6];
        put_u16(&mut buf, 2, value_len);
        put_u16(&mut buf, 4, value_type);
        buf.extend(utf16z(key));
        pad_to(&mut buf, 4);
        buf.extend_from_slice(value);
        pad_to(&mut buf, 4);
        buf.extend_from_slice(children);
        let len = buf.len() as u16;
        put_u16(&mut buf, 0, len);
        buf
    }

    /// A `VS_VERSION_INFO` blob with one string table holding `pairs`.
    pub fn version_resource(pairs: &[(&str, &str)]) -> Vec<u8> {
        let strings: Vec<u8> = pairs
            .iter()
            .flat_map(|(key, value)| {
                let v = utf16z(value);
                let mut s = block(key, (v.len() / 2) as u16, 1, &v, &[]);
                pad_to(&mut s, 4);
                s
            })
            .collect();
        let table = block("040904b0", 0, 1, &[], &strings);
        let sfi = block("StringFileInfo", 0, 1, &[], &table);
        let translation = block("Translation", 4, 0, &[0x09, 0x04, 0xb0, 0x04], &[]);
        let var = block("VarFileInfo", 0, 1, &[], &translation);
        let mut fixed = vec![0u8; 52];
        put_u32(&mut fixed, 0, 0xFEEF_04BD);
        block("VS_VERSION_INFO", 52, 0, &fixed, &[sfi, var].concat())
    }
}

pub mod pe {
    use super::*;

    const FILE_ALIGNMENT: usize = 0x200;
    const SECTION_ALIGNMENT: u32 = 0x1000;

    /// Which data directory a section holds
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Directory {
        None,
        Import,
        Resource,
    }

    pub struct SectionSpec {
        pub name: &'static str,
        pub data: Vec<u8>,
        pub directory: Directory,
    }

    /// Minimal PE image builder
    pub struct PeBuilder {
        pub is_64bit: bool,
        pub timestamp: u32,
        pub entrypoint: u32,
        sections: Vec<SectionSpec>,
    }

    impl PeBuilder {
        pub fn new(is_64bit: bool) -> Self {
            Self {
                is_64bit,
                timestamp: 0x5F00_0000,
                entrypoint: 0x1000,
                sections: Vec::new(),
            }
        }

        /// Virtual address the next added section will be mapped at.
        pub fn next_rva(&self) -> u32 {
            SECTION_ALIGNMENT * (self.sections.len() as u32 + 1)
        }

        pub fn section(mut self, name: &'static str, data: Vec<u8>, directory: Directory) -> Self {
            self.sections.push(SectionSpec { name, data, directory });
            self
        }

        pub fn build(&self) -> Vec<u8> {
            let e_lfanew = 0x40usize;
            let optional_size: usize = if self.is_64bit { 240 } else { 224 };
            let section_table = e_lfanew + 24 + optional_size;
            let headers_end = section_table + 40 * self.sections.len();
            let size_of_headers = (headers_end + FILE_ALIGNMENT - 1) / FILE_ALIGNMENT * FILE_ALIGNMENT;

            let mut buf = vec![0u8; size_of_headers];
            buf[0] = b'M';
            buf[1] = b'Z';
            put_u32(&mut buf, 0x3c, e_lfanew as u32);
            buf[e_lfanew..e_lfanew + 4].copy_from_slice(b"PE\0\0");

            let coff = e_lfanew + 4;
            put_u16(&mut buf, coff, if self.is_64bit { 0x8664 } else { 0x014c });
            put_u16(&mut buf, coff + 2, self.sections.len() as u16);
            put_u32(&mut buf, coff + 4, self.timestamp);
            put_u16(&mut buf, coff + 16, optional_size as u16);
            put_u16(&mut buf, coff + 18, 0x0102);

            let opt = coff + 20;
            let size_of_image = self.next_rva();
            put_u16(&mut buf, opt, if self.is_64bit { 0x20b } else { 0x10b });
            put_u32(&mut buf, opt + 16, self.entrypoint);
            put_u32(&mut buf, opt + 32, SECTION_ALIGNMENT);
            put_u32(&mut buf, opt + 36, FILE_ALIGNMENT as u32);
            put_u16(&mut buf, opt + 40, 6);
            put_u16(&mut buf, opt + 48, 6);
            put_u32(&mut buf, opt + 56, size_of_image);
            put_u32(&mut buf, opt + 60, size_of_headers as u32);
            put_u16(&mut buf, opt + 68, 3);
            let directories = if self.is_64bit {
                put_u64(&mut buf, opt + 24, 0x1_4000_0000);
                put_u32(&mut buf, opt + 108, 16);
                opt + 112
            } else {
                put_u32(&mut buf, opt + 28, 0x0040_0000);
                put_u32(&mut buf, opt + 92, 16);
                opt + 96
            };

            let mut raw_offset = size_of_headers;
            let mut raw_sections = Vec::new();
            for (i, section) in self.sections.iter().enumerate() {
                let rva = SECTION_ALIGNMENT * (i as u32 + 1);
                let raw_size = (section.data.len() + FILE_ALIGNMENT - 1) / FILE_ALIGNMENT * FILE_ALIGNMENT;

                let header = section_table + 40 * i;
                let name = section.name.as_bytes();
                buf[header..header + name.len()].copy_from_slice(name);
                put_u32(&mut buf, header + 8, section.data.len() as u32);
                put_u32(&mut buf, header + 12, rva);
                put_u32(&mut buf, header + 16, raw_size as u32);
                put_u32(&mut buf, header + 20, raw_offset as u32);
                put_u32(&mut buf, header + 36, 0x4000_0040);

                let slot = match section.directory {
                    Directory::Import => Some(1),
                    Directory::Resource => Some(2),
                    Directory::None => None,
                };
                if let Some(slot) = slot {
                    put_u32(&mut buf, directories + slot * 8, rva);
                    put_u32(&mut buf, directories + slot * 8 + 4, section.data.len() as u32);
                }

                let mut raw = section.data.clone();
                raw.resize(raw_size, 0);
                raw_sections.push(raw);
                raw_offset += raw_size;
            }

            for raw in raw_sections {
                buf.extend_from_slice(&raw);
            }
            buf
        }
    }
}

pub mod objects {
    use object::write::{Object, StandardSection, Symbol, SymbolSection};
    use object::{Architecture, BinaryFormat, Endianness, SymbolFlags, SymbolKind, SymbolScope};

    /// How a test symbol is declared
    #[derive(Debug, Clone, Copy)]
    pub enum Decl {
        /// Global default-visibility function
        Function,
        /// File-local function
        Local,
        /// Global function with hidden visibility
        Hidden,
        /// Global data object
        Data,
    }

    /// ELF relocatable object whose `.symtab` holds `symbols`.
    pub fn elf_object(symbols: &[(&str, Decl)]) -> Vec<u8> {
        let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
        let text = obj.section_id(StandardSection::Text);
        obj.append_section_data(text, &[0xc3; 64], 16);
        let data = obj.section_id(StandardSection::Data);
        obj.append_section_data(data, &[0; 64], 8);

        for (i, (name, decl)) in symbols.iter().enumerate() {
            let (kind, scope, section) = match decl {
                Decl::Function => (SymbolKind::Text, SymbolScope::Dynamic, text),
                Decl::Local => (SymbolKind::Text, SymbolScope::Compilation, text),
                Decl::Hidden => (SymbolKind::Text, SymbolScope::Linkage, text),
                Decl::Data => (SymbolKind::Data, SymbolScope::Dynamic, data),
            };
            obj.add_symbol(Symbol {
                name: name.as_bytes().to_vec(),
                value: i as u64,
                size: 1,
                kind,
                scope,
                weak: false,
                section: SymbolSection::Section(section),
                flags: SymbolFlags::None,
            });
        }
        obj.write().unwrap()
    }

    /// Thin x86-64 Mach-O object importing `imports` and defining `defined`.
    pub fn macho_object(imports: &[&str], defined: &[&str]) -> Vec<u8> {
        let mut obj = Object::new(BinaryFormat::MachO, Architecture::X86_64, Endianness::Little);
        let text = obj.section_id(StandardSection::Text);
        obj.append_section_data(text, &[0xc3; 64], 16);

        for name in imports {
            obj.add_symbol(Symbol {
                name: name.as_bytes().to_vec(),
                value: 0,
                size: 0,
                kind: SymbolKind::Text,
                scope: SymbolScope::Dynamic,
                weak: false,
                section: SymbolSection::Undefined,
                flags: SymbolFlags::None,
            });
        }
        for (i, name) in defined.iter().enumerate() {
            obj.add_symbol(Symbol {
                name: name.as_bytes().to_vec(),
                value: i as u64,
                size: 1,
                kind: SymbolKind::Text,
                scope: SymbolScope::Dynamic,
                weak: false,
                section: SymbolSection::Section(text),
                flags: SymbolFlags::None,
            });
        }
        obj.write().unwrap()
    }
}
