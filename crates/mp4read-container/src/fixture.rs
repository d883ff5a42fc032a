//! Minimal non-fragmented MP4 writer for building test fixtures.
//!
//! Produces just enough structure for the prober and extractor: ftyp, one mdat
//! holding every track's chunks back to back, and a moov whose trak boxes carry
//! tkhd, mdhd, hdlr and a complete stbl.

/// Write a complete box: size (u32 BE) + type + content.
pub fn write_box(box_type: &[u8; 4], content: &[u8]) -> Vec<u8> {
    let size = (8 + content.len()) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(box_type);
    out.extend_from_slice(content);
    out
}

/// Write a container box holding the concatenated children.
pub fn write_container_box(box_type: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    write_box(box_type, &children.concat())
}

/// Write a full box: version + flags prepended to the content.
pub fn write_full_box(box_type: &[u8; 4], version: u8, flags: u32, content: &[u8]) -> Vec<u8> {
    let header = ((version as u32) << 24) | (flags & 0x00FF_FFFF);
    let mut body = header.to_be_bytes().to_vec();
    body.extend_from_slice(content);
    write_box(box_type, &body)
}

#[derive(Debug, Clone)]
enum Payload {
    /// One length-prefixed NAL unit of the given type and total length.
    Nal { nal_type: u8, len: usize },
    /// Bytes written verbatim.
    Raw(Vec<u8>),
}

/// One sample of a fixture track.
#[derive(Debug, Clone)]
pub struct FixtureSample {
    payload: Payload,
    duration: u32,
    composition_offset: i32,
    sync: bool,
}

impl FixtureSample {
    /// An IDR access unit: one type-5 NAL of `nal_len` bytes.
    pub fn keyframe(nal_len: usize, duration: u32) -> Self {
        Self {
            payload: Payload::Nal { nal_type: 5, len: nal_len.max(1) },
            duration,
            composition_offset: 0,
            sync: true,
        }
    }

    /// A non-IDR access unit: one type-1 NAL of `nal_len` bytes.
    pub fn delta(nal_len: usize, duration: u32) -> Self {
        Self {
            payload: Payload::Nal { nal_type: 1, len: nal_len.max(1) },
            duration,
            composition_offset: 0,
            sync: false,
        }
    }

    /// A zero-byte sample that only carries timing.
    pub fn empty(duration: u32) -> Self {
        Self::raw(Vec::new(), duration)
    }

    /// A sample with verbatim payload bytes.
    pub fn raw(data: Vec<u8>, duration: u32) -> Self {
        Self {
            payload: Payload::Raw(data),
            duration,
            composition_offset: 0,
            sync: false,
        }
    }

    pub fn with_composition_offset(mut self, offset: i32) -> Self {
        self.composition_offset = offset;
        self
    }

    /// Encoded size of this sample for a track using `length_size` prefixes.
    pub fn size(&self, length_size: u8) -> usize {
        match &self.payload {
            Payload::Nal { len, .. } => length_size as usize + len,
            Payload::Raw(data) => data.len(),
        }
    }

    fn encode(&self, length_size: u8) -> Vec<u8> {
        match &self.payload {
            Payload::Nal { nal_type, len } => {
                let prefix = (*len as u64).to_be_bytes();
                let mut out = prefix[8 - length_size as usize..].to_vec();
                let nal_ref_idc = if *nal_type == 5 { 3 } else { 2 };
                out.push((nal_ref_idc << 5) | nal_type);
                out.extend(std::iter::repeat(0xAB).take(len - 1));
                out
            }
            Payload::Raw(data) => data.clone(),
        }
    }
}

#[derive(Debug, Clone)]
enum SyncTable {
    FromKeyframes,
    Explicit(Vec<u32>),
    Omit,
}

/// A track to be written by [`Mp4Builder`].
#[derive(Debug, Clone)]
pub struct FixtureTrack {
    track_id: u32,
    handler: [u8; 4],
    timescale: u32,
    width: u16,
    height: u16,
    length_size: u8,
    sps: Vec<u8>,
    pps: Vec<u8>,
    write_avcc: bool,
    sync_table: SyncTable,
    chunk_layout: Option<Vec<u32>>,
    samples: Vec<FixtureSample>,
}

impl FixtureTrack {
    /// A 320x240 H.264 track at 90 kHz with 4-byte NAL length prefixes.
    pub fn avc(track_id: u32, samples: Vec<FixtureSample>) -> Self {
        Self {
            track_id,
            handler: *b"vide",
            timescale: 90000,
            width: 320,
            height: 240,
            length_size: 4,
            sps: vec![0x67, 0x42, 0x00, 0x1E, 0x95, 0xA8],
            pps: vec![0x68, 0xCE, 0x38, 0x80],
            write_avcc: true,
            sync_table: SyncTable::FromKeyframes,
            chunk_layout: None,
            samples,
        }
    }

    /// A 48 kHz sound track with an `mp4a` sample entry.
    pub fn audio(track_id: u32, samples: Vec<FixtureSample>) -> Self {
        Self {
            handler: *b"soun",
            timescale: 48000,
            write_avcc: false,
            sync_table: SyncTable::Omit,
            ..Self::avc(track_id, samples)
        }
    }

    /// Samples per chunk, in chunk order. Defaults to one chunk for all samples.
    pub fn with_chunks(mut self, layout: Vec<u32>) -> Self {
        self.chunk_layout = Some(layout);
        self
    }

    pub fn with_timescale(mut self, timescale: u32) -> Self {
        self.timescale = timescale;
        self
    }

    pub fn with_dimensions(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_length_size(mut self, length_size: u8) -> Self {
        self.length_size = length_size;
        self
    }

    pub fn with_parameter_sets(mut self, sps: Vec<u8>, pps: Vec<u8>) -> Self {
        self.sps = sps;
        self.pps = pps;
        self
    }

    /// Write an `stss` with exactly these 1-based sample numbers.
    pub fn with_sync_samples(mut self, numbers: Vec<u32>) -> Self {
        self.sync_table = SyncTable::Explicit(numbers);
        self
    }

    /// Leave out `stss`, forcing readers to scan for IDR frames.
    pub fn without_sync_table(mut self) -> Self {
        self.sync_table = SyncTable::Omit;
        self
    }

    /// Keep the avc1 sample entry but leave out its `avcC` child.
    pub fn without_avcc(mut self) -> Self {
        self.write_avcc = false;
        self
    }

    fn duration(&self) -> u64 {
        self.samples.iter().map(|s| s.duration as u64).sum()
    }

    fn chunk_layout(&self) -> Vec<u32> {
        self.chunk_layout
            .clone()
            .unwrap_or_else(|| vec![self.samples.len() as u32])
    }

    /// Chunk payloads in order.
    fn chunk_data(&self) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        let mut samples = self.samples.iter();
        for count in self.chunk_layout() {
            let mut chunk = Vec::new();
            for sample in samples.by_ref().take(count as usize) {
                chunk.extend_from_slice(&sample.encode(self.length_size));
            }
            chunks.push(chunk);
        }
        chunks
    }

    fn write_trak(&self, chunk_offsets: &[u64]) -> Vec<u8> {
        let duration = self.duration();

        let mut tkhd = Vec::new();
        tkhd.extend_from_slice(&0u32.to_be_bytes()); // creation
        tkhd.extend_from_slice(&0u32.to_be_bytes()); // modification
        tkhd.extend_from_slice(&self.track_id.to_be_bytes());
        tkhd.extend_from_slice(&0u32.to_be_bytes()); // reserved
        tkhd.extend_from_slice(&(duration as u32).to_be_bytes());
        tkhd.extend_from_slice(&[0u8; 52]);
        tkhd.extend_from_slice(&((self.width as u32) << 16).to_be_bytes());
        tkhd.extend_from_slice(&((self.height as u32) << 16).to_be_bytes());

        let mut mdhd = Vec::new();
        mdhd.extend_from_slice(&0u32.to_be_bytes());
        mdhd.extend_from_slice(&0u32.to_be_bytes());
        mdhd.extend_from_slice(&self.timescale.to_be_bytes());
        mdhd.extend_from_slice(&(duration as u32).to_be_bytes());
        mdhd.extend_from_slice(&0x55C4u16.to_be_bytes()); // "und"
        mdhd.extend_from_slice(&0u16.to_be_bytes());

        let mut hdlr = Vec::new();
        hdlr.extend_from_slice(&0u32.to_be_bytes());
        hdlr.extend_from_slice(&self.handler);
        hdlr.extend_from_slice(&[0u8; 12]);
        hdlr.push(0);

        let stbl = write_container_box(b"stbl", &self.write_stbl_children(chunk_offsets));
        let minf = write_container_box(b"minf", &[stbl]);
        let mdia = write_container_box(
            b"mdia",
            &[
                write_full_box(b"mdhd", 0, 0, &mdhd),
                write_full_box(b"hdlr", 0, 0, &hdlr),
                minf,
            ],
        );
        write_container_box(b"trak", &[write_full_box(b"tkhd", 0, 3, &tkhd), mdia])
    }

    fn write_stbl_children(&self, chunk_offsets: &[u64]) -> Vec<Vec<u8>> {
        let mut children = vec![self.write_stsd()];

        let durations: Vec<u32> = self.samples.iter().map(|s| s.duration).collect();
        children.push(write_runs(b"stts", 0, &durations));

        let offsets: Vec<i32> = self.samples.iter().map(|s| s.composition_offset).collect();
        if offsets.iter().any(|&o| o != 0) {
            children.push(write_runs(b"ctts", 1, &offsets));
        }

        let sync_numbers = match &self.sync_table {
            SyncTable::FromKeyframes => Some(
                self.samples
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.sync)
                    .map(|(i, _)| i as u32 + 1)
                    .collect::<Vec<_>>(),
            ),
            SyncTable::Explicit(numbers) => Some(numbers.clone()),
            SyncTable::Omit => None,
        };
        if let Some(numbers) = sync_numbers {
            let mut stss = (numbers.len() as u32).to_be_bytes().to_vec();
            for n in numbers {
                stss.extend_from_slice(&n.to_be_bytes());
            }
            children.push(write_full_box(b"stss", 0, 0, &stss));
        }

        let layout = self.chunk_layout();
        let mut stsc = (layout.len() as u32).to_be_bytes().to_vec();
        for (i, count) in layout.iter().enumerate() {
            stsc.extend_from_slice(&(i as u32 + 1).to_be_bytes());
            stsc.extend_from_slice(&count.to_be_bytes());
            stsc.extend_from_slice(&1u32.to_be_bytes());
        }
        children.push(write_full_box(b"stsc", 0, 0, &stsc));

        let mut stsz = 0u32.to_be_bytes().to_vec();
        stsz.extend_from_slice(&(self.samples.len() as u32).to_be_bytes());
        for sample in &self.samples {
            stsz.extend_from_slice(&(sample.size(self.length_size) as u32).to_be_bytes());
        }
        children.push(write_full_box(b"stsz", 0, 0, &stsz));

        let mut stco = (chunk_offsets.len() as u32).to_be_bytes().to_vec();
        for offset in chunk_offsets {
            stco.extend_from_slice(&(*offset as u32).to_be_bytes());
        }
        children.push(write_full_box(b"stco", 0, 0, &stco));

        children
    }

    fn write_stsd(&self) -> Vec<u8> {
        let entry = if &self.handler == b"vide" {
            let mut avc1 = Vec::new();
            avc1.extend_from_slice(&[0u8; 6]);
            avc1.extend_from_slice(&1u16.to_be_bytes()); // data_reference_index
            avc1.extend_from_slice(&[0u8; 16]);
            avc1.extend_from_slice(&self.width.to_be_bytes());
            avc1.extend_from_slice(&self.height.to_be_bytes());
            avc1.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // horizresolution
            avc1.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // vertresolution
            avc1.extend_from_slice(&0u32.to_be_bytes());
            avc1.extend_from_slice(&1u16.to_be_bytes()); // frame_count
            avc1.extend_from_slice(&[0u8; 32]); // compressorname
            avc1.extend_from_slice(&0x0018u16.to_be_bytes()); // depth
            avc1.extend_from_slice(&(-1i16).to_be_bytes());
            if self.write_avcc {
                avc1.extend_from_slice(&write_box(b"avcC", &self.avcc()));
            }
            write_box(b"avc1", &avc1)
        } else {
            write_box(b"mp4a", &[0u8; 28])
        };

        let mut stsd = 1u32.to_be_bytes().to_vec();
        stsd.extend_from_slice(&entry);
        write_full_box(b"stsd", 0, 0, &stsd)
    }

    fn avcc(&self) -> Vec<u8> {
        let mut out = vec![
            0x01,
            self.sps.get(1).copied().unwrap_or(0x42),
            0x00,
            self.sps.get(3).copied().unwrap_or(0x1E),
            0xFC | (self.length_size - 1),
            0xE1,
        ];
        out.extend_from_slice(&(self.sps.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.sps);
        out.push(1);
        out.extend_from_slice(&(self.pps.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.pps);
        out
    }
}

/// Run-length encode (count, value) pairs into a table full box.
fn write_runs<T>(box_type: &[u8; 4], version: u8, values: &[T]) -> Vec<u8>
where
    T: Copy + PartialEq + Into<i64>,
{
    let mut runs: Vec<(u32, T)> = Vec::new();
    for &value in values {
        match runs.last_mut() {
            Some((count, last)) if *last == value => *count += 1,
            _ => runs.push((1, value)),
        }
    }

    let mut body = (runs.len() as u32).to_be_bytes().to_vec();
    for (count, value) in runs {
        body.extend_from_slice(&count.to_be_bytes());
        body.extend_from_slice(&(Into::<i64>::into(value) as u32).to_be_bytes());
    }
    write_full_box(box_type, version, 0, &body)
}

/// Builds a complete MP4 file in memory.
#[derive(Debug, Default)]
pub struct Mp4Builder {
    tracks: Vec<FixtureTrack>,
    faststart: bool,
}

impl Mp4Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(mut self, track: FixtureTrack) -> Self {
        self.tracks.push(track);
        self
    }

    /// Place moov before mdat.
    pub fn faststart(mut self) -> Self {
        self.faststart = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut ftyp = b"isom".to_vec();
        ftyp.extend_from_slice(&0x200u32.to_be_bytes());
        ftyp.extend_from_slice(b"isomavc1");
        let ftyp = write_box(b"ftyp", &ftyp);

        let track_chunks: Vec<Vec<Vec<u8>>> = self.tracks.iter().map(|t| t.chunk_data()).collect();
        let mdat_content: Vec<u8> = track_chunks.iter().flatten().flatten().copied().collect();
        let mdat = write_box(b"mdat", &mdat_content);

        let mdat_data_start = if self.faststart {
            // moov size does not depend on the offsets it stores
            let moov_len = self.write_moov(&track_chunks, 0).len();
            ftyp.len() + moov_len + 8
        } else {
            ftyp.len() + 8
        };
        let moov = self.write_moov(&track_chunks, mdat_data_start as u64);

        if self.faststart {
            [ftyp, moov, mdat].concat()
        } else {
            [ftyp, mdat, moov].concat()
        }
    }

    fn write_moov(&self, track_chunks: &[Vec<Vec<u8>>], mdat_data_start: u64) -> Vec<u8> {
        let movie_duration_ms = self
            .tracks
            .iter()
            .map(|t| t.duration() * 1000 / t.timescale.max(1) as u64)
            .max()
            .unwrap_or(0);

        let mut mvhd = Vec::new();
        mvhd.extend_from_slice(&0u32.to_be_bytes());
        mvhd.extend_from_slice(&0u32.to_be_bytes());
        mvhd.extend_from_slice(&1000u32.to_be_bytes());
        mvhd.extend_from_slice(&(movie_duration_ms as u32).to_be_bytes());
        mvhd.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate
        mvhd.extend_from_slice(&0x0100u16.to_be_bytes()); // volume
        mvhd.extend_from_slice(&[0u8; 10]);
        mvhd.extend_from_slice(&[0u8; 36]); // matrix
        mvhd.extend_from_slice(&[0u8; 24]);
        mvhd.extend_from_slice(&(self.tracks.len() as u32 + 1).to_be_bytes());

        let mut children = vec![write_full_box(b"mvhd", 0, 0, &mvhd)];
        let mut offset = mdat_data_start;
        for (track, chunks) in self.tracks.iter().zip(track_chunks) {
            let mut chunk_offsets = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                chunk_offsets.push(offset);
                offset += chunk.len() as u64;
            }
            children.push(track.write_trak(&chunk_offsets));
        }

        write_container_box(b"moov", &children)
    }
}
