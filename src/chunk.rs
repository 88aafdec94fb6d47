use crate::material::BlockState;
use crate::types::ChunkPos;

const SECTION_CELLS: usize = 16 * 16 * 16;
const MASK: u64 = 0b11111_11111_11111;

/// 16 high slice of a chunk. Palette indices are packed four to a long, 15 bits each.
#[derive(Debug, Clone, Default)]
struct Section {
    nonair: u16,
    blocks: Option<Box<[u64]>>,
}

/// Owned copy of a chunk's blocks. Cheap to ship to a counting thread and
/// never observes later edits.
#[derive(Debug, Clone)]
pub struct ChunkSnapshot {
    pos: ChunkPos,
    min_y: i32,
    /// Index 0 is always air.
    palette: Vec<BlockState>,
    sections: Vec<Section>,
}

impl ChunkSnapshot {
    pub fn empty(pos: ChunkPos, min_y: i32, height: u32) -> Self {
        Self {
            pos,
            min_y,
            palette: vec![BlockState::AIR],
            sections: vec![Section::default(); (height as usize).div_ceil(16)],
        }
    }
    pub fn pos(&self) -> ChunkPos {
        self.pos
    }
    pub fn max_y(&self) -> i32 {
        self.min_y + self.sections.len() as i32 * 16
    }
    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    fn locate(&self, x: i32, y: i32, z: i32) -> Option<(usize, usize)> {
        if !(0..16).contains(&x) || !(0..16).contains(&z) || y < self.min_y || y >= self.max_y() {
            return None;
        }
        let dy = (y - self.min_y) as usize;
        Some((dy / 16, (dy % 16) * 256 + z as usize * 16 + x as usize))
    }

    /// Block at chunk-local `x`/`z` and absolute `y`. Outside the chunk is air.
    pub fn get(&self, x: i32, y: i32, z: i32) -> BlockState {
        match self.locate(x, y, z) {
            Some((section, idx)) => self.palette[self.sections[section].index(idx)],
            None => BlockState::AIR,
        }
    }

    /// Writes a block and returns what was there.
    pub fn set(&mut self, x: i32, y: i32, z: i32, state: BlockState) -> BlockState {
        let Some((section, idx)) = self.locate(x, y, z) else {
            return BlockState::AIR;
        };
        let id = match self.palette.iter().position(|s| *s == state) {
            Some(id) => id,
            None => {
                assert!(self.palette.len() <= MASK as usize, "chunk palette overflow");
                self.palette.push(state);
                self.palette.len() - 1
            }
        };
        let section = &mut self.sections[section];
        let blocks = section
            .blocks
            .get_or_insert_with(|| vec![0u64; SECTION_CELLS / 4].into_boxed_slice());
        let long = &mut blocks[idx / 4];
        let shift = (idx % 4) * 15;
        let old = ((*long >> shift) & MASK) as usize;
        *long = (*long & !(MASK << shift)) | (id as u64) << shift;
        if old == 0 && id != 0 {
            section.nonair += 1;
        } else if old != 0 && id == 0 {
            section.nonair -= 1;
        }
        self.palette[old]
    }

    /// Visits every non-air cell as `(x, y, z, palette index)`, restricted to
    /// local columns `xs` × `zs`. Empty sections are skipped.
    pub fn for_each_cell(
        &self,
        xs: std::ops::Range<i32>,
        zs: std::ops::Range<i32>,
        mut f: impl FnMut(i32, i32, i32, usize),
    ) {
        for (i, section) in self.sections.iter().enumerate() {
            let Some(blocks) = section.blocks.as_deref().filter(|_| section.nonair > 0) else {
                continue;
            };
            let base_y = self.min_y + i as i32 * 16;
            for dy in 0..16 {
                for z in zs.clone() {
                    for x in xs.clone() {
                        let idx = dy * 256 + z as usize * 16 + x as usize;
                        let id = ((blocks[idx / 4] >> ((idx % 4) * 15)) & MASK) as usize;
                        if id != 0 {
                            f(x, base_y + dy as i32, z, id);
                        }
                    }
                }
            }
        }
    }
}

impl Section {
    fn index(&self, idx: usize) -> usize {
        match &self.blocks {
            Some(blocks) => ((blocks[idx / 4] >> ((idx % 4) * 15)) & MASK) as usize,
            None => 0,
        }
    }
}
