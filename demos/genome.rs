// SPDX-License-Identifier: Apache-2.0

//! Decodes a synthetic genome sequence into a sequence of amino acids via
//! both std::io and the buffered reader/writer adapters, comparing timing.
//! There's no file collaborator in this crate (spec non-goal), so the
//! "file" is a byte vector held in memory instead of a path on disk.

use std::io::{BufReader, BufWriter, Read, Write};
use std::sync::Arc;
use std::time::Instant;
use fluxio::pool::SegmentPool;
use fluxio::streams::{BufferedReader, BufferedWriter};
use fluxio::{Error, SEGMENT_SIZE};

const BASE_COUNT: usize = 1_500_000;

fn main() -> Result<(), Error> {
	let genome = synthetic_genome(BASE_COUNT);
	let triplet = &mut [0u8; 3];

	let mut seq = String::with_capacity(32);
	let mut count = 0;
	let mut out = Vec::with_capacity(genome.len() / 3);
	let mut reader = BufReader::new(&genome[..]);
	let mut writer = BufWriter::new(&mut out);
	let now = Instant::now();
	while reader.read_exact(triplet).is_ok() {
		let codon = decode_triplet(triplet) as u8;
		if seq.len() < 32 {
			seq.push(codon as char);
		}
		writer.write_all(&[codon]).unwrap();
		count += 3;
	}
	drop(writer);
	let time = now.elapsed().as_micros();
	println!("Decoded sequence of {count} bytes via std::io in {time}us: {seq}...");

	seq.clear();
	count = 0;
	let mut out = Vec::with_capacity(genome.len() / 3);
	let pool: Arc<SegmentPool<SEGMENT_SIZE>> = SegmentPool::shared();
	let mut source: BufferedReader<SEGMENT_SIZE, _, _> = BufferedReader::new(&genome[..], pool.clone());
	let mut sink: BufferedWriter<SEGMENT_SIZE, _, _> = BufferedWriter::new(Vec::<u8>::new(), pool);
	let now = Instant::now();
	while source.request(3)? {
		let bytes = source.read_byte_string(3)?;
		let triplet: [u8; 3] = bytes.as_bytes().try_into().expect("exactly 3 bytes just read");
		let codon = decode_triplet(&triplet) as u8;
		if seq.len() < 32 {
			seq.push(codon as char);
		}
		sink.write_bytes(&[codon])?;
		count += 3;
	}
	sink.flush()?;
	let time = now.elapsed().as_micros();
	out.clear();

	println!("Decoded sequence of {count} bytes via the buffered adapters in {time}us: {seq}...");
	Ok(())
}

/// A deterministic stand-in for a real genome FASTA body: a repeating,
/// shuffled span of the four bases, long enough to exercise several segments.
fn synthetic_genome(base_count: usize) -> Vec<u8> {
	const BASES: [u8; 4] = *b"acgt";
	let mut out = Vec::with_capacity(base_count);
	let mut state: u64 = 0x2545F4914F6CDD1D;
	for _ in 0..base_count {
		// xorshift64*, just enough entropy to avoid a monotonous sequence.
		state ^= state << 13;
		state ^= state >> 7;
		state ^= state << 17;
		out.push(BASES[(state % 4) as usize]);
	}
	out
}

#[derive(Debug)]
#[repr(u8)]
enum Amino {
	Phe = b'F', Leu = b'L', Tyr = b'Y',
	His = b'H', Gln = b'Q', Ile = b'I',
	Met = b'M', Asn = b'N', Lys = b'K',
	Val = b'V', Asp = b'D', Glu = b'E',
	Ser = b'S', Cys = b'C', Trp = b'W',
	Pro = b'P', Arg = b'R', Thr = b'T',
	Ala = b'A', Gly = b'G', Stop = b'*'
}

fn decode_triplet(triplet: &[u8; 3]) -> Amino {
	// https://www.genscript.com/tools/codon-frequency-table
	match triplet {
		b"ttt" | b"ttc" => Amino::Phe,
		b"tta" | b"ttg" | [ b'c', b't', _ ] => Amino::Leu,
		b"tat" | b"tac" => Amino::Tyr,
		b"cat" | b"cac" => Amino::His,
		b"caa" | b"cag" => Amino::Gln,
		b"att" | b"atc" | b"ata" => Amino::Ile,
		b"atg" => Amino::Met,
		b"aat" | b"aac" => Amino::Asn,
		b"aaa" | b"aag" => Amino::Lys,
		[ b'g', b't', _ ] => Amino::Val,
		b"gat" | b"gac" => Amino::Asp,
		b"gaa" | b"gag" => Amino::Glu,
		[ b't', b'c', _ ] | b"agt" | b"agc" => Amino::Ser,
		b"tgt" | b"tgc" => Amino::Cys,
		b"tgg" => Amino::Trp,
		[ b'c', b'c', _ ] => Amino::Pro,
		[ b'c', b'g', _ ] | b"aga" | b"agg" => Amino::Arg,
		[ b'a', b'c', _ ] => Amino::Thr,
		[ b'g', b'c', _ ] => Amino::Ala,
		[ b'g', b'g', _ ] => Amino::Gly,
		b"taa" | b"tag" | b"tga" => Amino::Stop,
		_ => unreachable!()
	}
}
