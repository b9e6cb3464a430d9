//! Minimal PSD writer used to build test documents.
//!
//! Produces 8-bit files the `psd` crate reads back: header, optional indexed
//! palette, layer records with `luni`/`lsct` blocks, and a merged image.

const MODE_GRAYSCALE: u16 = 1;
const MODE_INDEXED: u16 = 2;
const MODE_RGB: u16 = 3;
const MODE_CMYK: u16 = 4;
const MODE_LAB: u16 = 9;

pub(crate) struct FixtureLayer {
    name: String,
    left: i32,
    top: i32,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    blend: [u8; 4],
    opacity: u8,
    hidden: bool,
    clipped: bool,
    with_alpha: bool,
    section: Option<u32>,
}

impl FixtureLayer {
    pub fn solid(name: &str, left: i32, top: i32, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            name: name.to_string(),
            left,
            top,
            width,
            height,
            rgba: rgba.repeat((width * height) as usize),
            blend: *b"norm",
            opacity: 255,
            hidden: false,
            clipped: false,
            with_alpha: true,
            section: None,
        }
    }

    /// Folder record; sits above its children in file order.
    pub fn group(name: &str, hidden: bool) -> Self {
        Self {
            hidden,
            blend: *b"pass",
            section: Some(1),
            ..Self::solid(name, 0, 0, 0, 0, [0; 4])
        }
    }

    /// Section end record; sits below the group's children in file order.
    /// The `psd` crate takes group visibility from this record.
    pub fn group_end(hidden: bool) -> Self {
        Self {
            hidden,
            blend: *b"pass",
            section: Some(3),
            ..Self::solid("</Layer group>", 0, 0, 0, 0, [0; 4])
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn blend(mut self, key: [u8; 4]) -> Self {
        self.blend = key;
        self
    }

    /// Clip to the nearest unclipped layer below.
    pub fn clipped(mut self) -> Self {
        self.clipped = true;
        self
    }

    /// Leave out the transparency channel, like a background layer.
    pub fn without_alpha(mut self) -> Self {
        self.with_alpha = false;
        self
    }
}

pub(crate) struct PsdBuilder {
    width: u32,
    height: u32,
    mode: u16,
    merged: Vec<Vec<u8>>,
    palette: Option<Vec<[u8; 3]>>,
    rle: bool,
    layers: Vec<FixtureLayer>,
}

impl PsdBuilder {
    fn new(width: u32, height: u32, mode: u16) -> Self {
        let mut builder = Self {
            width,
            height,
            mode,
            merged: Vec::new(),
            palette: None,
            rle: false,
            layers: Vec::new(),
        };
        builder.merged = vec![vec![0; (width * height) as usize]; builder.color_channels()];
        builder
    }

    pub fn rgb(width: u32, height: u32) -> Self {
        Self::new(width, height, MODE_RGB)
    }

    pub fn grayscale(width: u32, height: u32) -> Self {
        Self::new(width, height, MODE_GRAYSCALE)
    }

    pub fn cmyk(width: u32, height: u32) -> Self {
        Self::new(width, height, MODE_CMYK)
    }

    pub fn lab(width: u32, height: u32) -> Self {
        Self::new(width, height, MODE_LAB)
    }

    /// Unused palette entries are written as black.
    pub fn indexed(width: u32, height: u32, palette: &[[u8; 3]]) -> Self {
        Self {
            palette: Some(palette.to_vec()),
            ..Self::new(width, height, MODE_INDEXED)
        }
    }

    /// Merged image as four-byte pixels; only the document's color channels are
    /// written (CMYK uses all four bytes, grayscale and indexed only the first).
    pub fn merged(mut self, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), (self.width * self.height * 4) as usize);
        self.merged = (0..self.color_channels()).map(|c| plane(&pixels, c)).collect();
        self
    }

    /// Merged image given channel by channel; extra planes become extra channels.
    pub fn merged_planes(mut self, planes: Vec<Vec<u8>>) -> Self {
        assert!(planes
            .iter()
            .all(|p| p.len() == (self.width * self.height) as usize));
        self.merged = planes;
        self
    }

    pub fn rle(mut self, rle: bool) -> Self {
        self.rle = rle;
        self
    }

    /// Layers are added bottom-most first, matching file order.
    pub fn layer(mut self, layer: FixtureLayer) -> Self {
        self.layers.push(layer);
        self
    }

    fn color_channels(&self) -> usize {
        match self.mode {
            MODE_GRAYSCALE | MODE_INDEXED => 1,
            MODE_CMYK => 4,
            _ => 3,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"8BPS");
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&[0; 6]);
        out.extend_from_slice(&(self.merged.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&8u16.to_be_bytes());
        out.extend_from_slice(&self.mode.to_be_bytes());

        match &self.palette {
            Some(palette) => {
                out.extend_from_slice(&768u32.to_be_bytes());
                for channel in 0..3 {
                    for entry in 0..256 {
                        out.push(palette.get(entry).map_or(0, |rgb| rgb[channel]));
                    }
                }
            }
            None => out.extend_from_slice(&0u32.to_be_bytes()),
        }
        out.extend_from_slice(&0u32.to_be_bytes()); // image resources

        let section = self.layer_and_mask_section();
        out.extend_from_slice(&(section.len() as u32).to_be_bytes());
        out.extend_from_slice(&section);

        // Merged image: one compression flag, all row counts, then every channel.
        let encoded: Vec<(Vec<u8>, Vec<u8>)> = self
            .merged
            .iter()
            .map(|samples| self.encode_plane(samples, self.width))
            .collect();

        out.extend_from_slice(&u16::from(self.rle).to_be_bytes());
        for (counts, _) in &encoded {
            out.extend_from_slice(counts);
        }
        for (_, data) in &encoded {
            out.extend_from_slice(data);
        }
        out
    }

    fn layer_and_mask_section(&self) -> Vec<u8> {
        if self.layers.is_empty() {
            return Vec::new();
        }

        let mut info = Vec::new();
        info.extend_from_slice(&(self.layers.len() as i16).to_be_bytes());

        let mut channel_data = Vec::new();
        for layer in &self.layers {
            let mut ids: Vec<i16> = Vec::new();
            if layer.with_alpha {
                ids.push(-1);
            }
            ids.extend(0..self.color_channels().min(3) as i16);

            info.extend_from_slice(&layer.top.to_be_bytes());
            info.extend_from_slice(&layer.left.to_be_bytes());
            info.extend_from_slice(&(layer.top + layer.height as i32).to_be_bytes());
            info.extend_from_slice(&(layer.left + layer.width as i32).to_be_bytes());
            info.extend_from_slice(&(ids.len() as u16).to_be_bytes());

            for &id in &ids {
                let source = if id == -1 { 3 } else { id as usize };
                let (counts, data) = self.encode_plane(&plane(&layer.rgba, source), layer.width);
                let mut channel = u16::from(self.rle).to_be_bytes().to_vec();
                channel.extend_from_slice(&counts);
                channel.extend_from_slice(&data);

                info.extend_from_slice(&id.to_be_bytes());
                info.extend_from_slice(&(channel.len() as u32).to_be_bytes());
                channel_data.extend_from_slice(&channel);
            }

            info.extend_from_slice(b"8BIM");
            info.extend_from_slice(&layer.blend);
            info.push(layer.opacity);
            info.push(u8::from(layer.clipped));
            info.push(if layer.hidden { 0x02 } else { 0x00 });
            info.push(0); // filler

            let extra = layer_extra(layer);
            info.extend_from_slice(&(extra.len() as u32).to_be_bytes());
            info.extend_from_slice(&extra);
        }
        info.extend_from_slice(&channel_data);
        if info.len() % 2 == 1 {
            info.push(0);
        }

        let mut section = Vec::new();
        section.extend_from_slice(&(info.len() as u32).to_be_bytes());
        section.extend_from_slice(&info);
        section.extend_from_slice(&0u32.to_be_bytes()); // global layer mask
        section
    }

    /// Returns (row byte counts, channel bytes); counts are empty for raw data.
    fn encode_plane(&self, samples: &[u8], width: u32) -> (Vec<u8>, Vec<u8>) {
        if !self.rle {
            return (Vec::new(), samples.to_vec());
        }

        let mut counts = Vec::new();
        let mut data = Vec::new();
        if width > 0 {
            for row in samples.chunks(width as usize) {
                let packed = pack_row(row);
                counts.extend_from_slice(&(packed.len() as u16).to_be_bytes());
                data.extend_from_slice(&packed);
            }
        }
        (counts, data)
    }
}

fn plane(pixels: &[u8], channel: usize) -> Vec<u8> {
    pixels.chunks_exact(4).map(|px| px[channel]).collect()
}

/// PackBits with both literal and repeat packets.
fn pack_row(row: &[u8]) -> Vec<u8> {
    let mut packed = Vec::new();
    let mut i = 0;

    while i < row.len() {
        let mut run = 1;
        while i + run < row.len() && row[i + run] == row[i] && run < 128 {
            run += 1;
        }

        if run >= 3 {
            packed.push((1 - run as i16) as i8 as u8);
            packed.push(row[i]);
            i += run;
            continue;
        }

        let start = i;
        while i < row.len() && i - start < 128 {
            if i + 2 < row.len() && row[i] == row[i + 1] && row[i] == row[i + 2] {
                break;
            }
            i += 1;
        }
        packed.push((i - start - 1) as u8);
        packed.extend_from_slice(&row[start..i]);
    }

    packed
}

fn layer_extra(layer: &FixtureLayer) -> Vec<u8> {
    let mut extra = Vec::new();
    extra.extend_from_slice(&0u32.to_be_bytes()); // mask
    extra.extend_from_slice(&0u32.to_be_bytes()); // blending ranges

    let ascii: Vec<u8> = layer
        .name
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect();
    extra.push(ascii.len() as u8);
    extra.extend_from_slice(&ascii);
    while extra.len() % 4 != 0 {
        extra.push(0);
    }

    let units: Vec<u16> = layer.name.encode_utf16().collect();
    extra.extend_from_slice(b"8BIMluni");
    extra.extend_from_slice(&((4 + units.len() * 2) as u32).to_be_bytes());
    extra.extend_from_slice(&(units.len() as u32).to_be_bytes());
    for unit in units {
        extra.extend_from_slice(&unit.to_be_bytes());
    }

    if let Some(kind) = layer.section {
        extra.extend_from_slice(b"8BIMlsct");
        extra.extend_from_slice(&4u32.to_be_bytes());
        extra.extend_from_slice(&kind.to_be_bytes());
    }
    extra
}
