//! Symbol dictionary segments (7.4.2) and the symbol dictionary decoding
//! procedure (6.5).

use alloc::vec::Vec;

use super::generic::{self, GenericParams};
use super::generic_refinement::{self, RefinementParams};
use super::text::{self, ReferenceCorner, TextRegionContexts, TextRegionParams};
use super::{
    AdaptivePixel, RefinementTemplate, Template, UNUSED_REFINEMENT_AT, parse_at_pixels,
    parse_refinement_at_pixels,
};
use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::bitmap::{Bitmap, CombinationOperator, MAX_SYMBOLS_PER_BYTE, PixelBudget};
use crate::context::ContextStats;
use crate::error::{DecodeError, Feature, Result, SymbolError, bail};
use crate::integer_decoder::IntegerDecoder;
use crate::reader::Reader;
use crate::symbol_id_decoder::SymbolIdDecoder;

/// A decoded symbol dictionary.
#[derive(Debug, Clone)]
pub(crate) struct SymbolDictionary {
    /// `SDEXSYMS`
    pub(crate) exported: Vec<Bitmap>,
    /// The coding statistics at the end of decoding, kept if the "bitmap
    /// coding context retained" flag was set.
    pub(crate) retained: Option<RetainedContexts>,
}

/// The arithmetic coding state a symbol dictionary retains for later
/// dictionaries (7.4.2.2).
#[derive(Debug, Clone)]
pub(crate) struct RetainedContexts {
    template: Template,
    refinement_template: RefinementTemplate,
    generic: ContextStats,
    refinement: ContextStats,
}

/// The header of a symbol dictionary segment (7.4.2.1).
#[derive(Debug, Clone)]
struct SymbolDictionaryHeader {
    /// `SDREFAGG`
    refinement_aggregate: bool,
    context_used: bool,
    context_retained: bool,
    /// `SDTEMPLATE`
    template: Template,
    /// `SDRTEMPLATE`
    refinement_template: RefinementTemplate,
    /// `SDATX` and `SDATY`
    at: Vec<AdaptivePixel>,
    /// `SDRATX` and `SDRATY`
    refinement_at: [AdaptivePixel; 2],
    /// `SDNUMEXSYMS`
    num_exported: u32,
    /// `SDNUMNEWSYMS`
    num_new: u32,
}

fn parse(reader: &mut Reader<'_>) -> Result<SymbolDictionaryHeader> {
    // 7.4.2.1.1
    let flags = reader.read_u16()?;

    // "Bit 0: SDHUFF"
    if flags & 0x0001 != 0 {
        bail!(Feature::Huffman);
    }

    // "Bit 1: SDREFAGG"
    let refinement_aggregate = flags & 0x0002 != 0;

    // "Bits 2-7: [...] If SDHUFF is 0 then these fields must contain the
    // value 0."
    if flags & 0x00FC != 0 {
        lwarn!("Huffman table selections set in arithmetic symbol dictionary");
    }

    // "Bit 8: Bitmap coding context used"
    let context_used = flags & 0x0100 != 0;
    // "Bit 9: Bitmap coding context retained"
    let context_retained = flags & 0x0200 != 0;
    // "Bits 10-11: SDTEMPLATE"
    let template = Template::from_value((flags >> 10) as u8);
    // "Bit 12: SDRTEMPLATE"
    let refinement_template = RefinementTemplate::from_bit(flags & 0x1000 != 0);

    if flags & 0xE000 != 0 {
        lwarn!("reserved symbol dictionary flags are set: {:#06x}", flags);
    }

    // 7.4.2.1.2
    let at = parse_at_pixels(reader, template)?;

    // "This field is only present if SDREFAGG is 1 and SDRTEMPLATE is 0."
    // (7.4.2.1.3)
    let refinement_at =
        if refinement_aggregate && refinement_template == RefinementTemplate::Template0 {
            parse_refinement_at_pixels(reader)?
        } else {
            UNUSED_REFINEMENT_AT
        };

    let num_exported = reader.read_u32()?;
    let num_new = reader.read_u32()?;

    Ok(SymbolDictionaryHeader {
        refinement_aggregate,
        context_used,
        context_retained,
        template,
        refinement_template,
        at,
        refinement_at,
        num_exported,
        num_new,
    })
}

/// The coding state of a symbol dictionary.
struct Coders<'a> {
    decoder: ArithmeticDecoder<'a>,
    iadh: IntegerDecoder,
    iadw: IntegerDecoder,
    iaex: IntegerDecoder,
    iaai: IntegerDecoder,
    generic: ContextStats,
    refinement: ContextStats,
}

/// Decode a symbol dictionary segment.
///
/// `input` are the symbols exported by the referred symbol dictionaries in
/// order (`SDINSYMS`), and `last_referred` is the last of those
/// dictionaries, whose retained coding state is used if the segment asks
/// for it.
pub(crate) fn decode(
    data: &[u8],
    input: &[&Bitmap],
    last_referred: Option<&SymbolDictionary>,
) -> Result<SymbolDictionary> {
    decode_with_budget(data, input, last_referred, PixelBudget::for_data(data.len()))
}

/// Decode a symbol dictionary segment whose new symbols may have at most
/// `budget` pixels in total.
fn decode_with_budget(
    data: &[u8],
    input: &[&Bitmap],
    last_referred: Option<&SymbolDictionary>,
    mut budget: PixelBudget,
) -> Result<SymbolDictionary> {
    let mut reader = Reader::new(data);
    let header = parse(&mut reader)?;

    if header.num_new as u64 > (data.len() as u64).max(1) * MAX_SYMBOLS_PER_BYTE {
        bail!(SymbolError::TooManySymbols);
    }

    let num_input = u32::try_from(input.len()).map_err(|_| SymbolError::TooManySymbols)?;
    let num_symbols = num_input
        .checked_add(header.num_new)
        .ok_or(SymbolError::TooManySymbols)?;

    if header.num_exported > num_symbols {
        bail!(SymbolError::ExportMismatch);
    }

    ldebug!(
        "symbol dictionary with {} input, {} new and {} exported symbols, {:?}, refinement/aggregate {}",
        num_input,
        header.num_new,
        header.num_exported,
        header.template,
        header.refinement_aggregate
    );

    let mut coders = Coders {
        decoder: ArithmeticDecoder::new(reader.tail()),
        iadh: IntegerDecoder::new(),
        iadw: IntegerDecoder::new(),
        iaex: IntegerDecoder::new(),
        iaai: IntegerDecoder::new(),
        generic: ContextStats::with_context_bits(header.template.context_bits()),
        refinement: ContextStats::with_context_bits(header.refinement_template.context_bits()),
    };

    // 7.4.2.2, step 3
    if header.context_used {
        inherit_contexts(&mut coders, &header, last_referred)?;
    }

    // "SBSYMCODELEN = ⌈log2(SDNUMINSYMS + SDNUMNEWSYMS)⌉" (6.5.8.2.3)
    let mut text_contexts = if header.refinement_aggregate {
        Some(TextRegionContexts::new(SymbolIdDecoder::code_len_for(
            num_symbols,
        ))?)
    } else {
        None
    };

    let new_symbols = decode_new_symbols(
        &mut coders,
        &header,
        input,
        text_contexts.as_mut(),
        &mut budget,
    )?;

    // 6.5.10
    let flags = export_flags(num_symbols as usize, || {
        coders.iaex.decode_no_oob(&mut coders.decoder)
    })?;

    let exported: Vec<Bitmap> = flags
        .iter()
        .zip(input.iter().copied().chain(new_symbols.iter()))
        .filter(|(exported, _)| **exported)
        .map(|(_, symbol)| symbol.clone())
        .collect();

    if exported.len() != header.num_exported as usize {
        lwarn!(
            "symbol dictionary exports {} symbols instead of {}",
            exported.len(),
            header.num_exported
        );
        bail!(SymbolError::ExportMismatch);
    }

    // 7.4.2.2, step 5
    let retained = header.context_retained.then(|| RetainedContexts {
        template: header.template,
        refinement_template: header.refinement_template,
        generic: coders.generic,
        refinement: coders.refinement,
    });

    Ok(SymbolDictionary { exported, retained })
}

/// "If the bitmap coding context used flag is 1 [...] set the arithmetic
/// coding statistics for the generic region and generic refinement region
/// decoding procedures to the values that they contained at the end of
/// decoding that symbol dictionary segment." (7.4.2.2)
fn inherit_contexts(
    coders: &mut Coders<'_>,
    header: &SymbolDictionaryHeader,
    last_referred: Option<&SymbolDictionary>,
) -> Result<()> {
    let Some(retained) = last_referred.and_then(|dictionary| dictionary.retained.as_ref()) else {
        lwarn!("symbol dictionary uses coding contexts that were not retained");
        return Ok(());
    };

    // The referred dictionary must have used the same templates, otherwise
    // its statistics belong to different contexts.
    if retained.template != header.template
        || (header.refinement_aggregate
            && retained.refinement_template != header.refinement_template)
    {
        bail!(SymbolError::MissingRetainedContext);
    }

    coders.generic.overwrite(&retained.generic);
    coders.refinement.overwrite(&retained.refinement);

    Ok(())
}

/// Decode the new symbols of the dictionary, height class by height class
/// (6.5.5, steps 1 to 4).
fn decode_new_symbols(
    coders: &mut Coders<'_>,
    header: &SymbolDictionaryHeader,
    input: &[&Bitmap],
    mut text_contexts: Option<&mut TextRegionContexts>,
    budget: &mut PixelBudget,
) -> Result<Vec<Bitmap>> {
    let num_new = header.num_new as usize;
    let mut new_symbols = Vec::new();

    let generic_params = GenericParams {
        template: header.template,
        at: &header.at,
        tpgdon: false,
        skip: None,
    };

    // "HCHEIGHT = 0, NSYMSDECODED = 0"
    let mut height = 0_u32;
    let mut height_classes = 0;

    // "4) Repeat step 3 until NSYMSDECODED = SDNUMNEWSYMS."
    while new_symbols.len() < num_new {
        // Every height class holds at least one symbol.
        height_classes += 1;
        if height_classes > num_new {
            bail!(SymbolError::TooManySymbols);
        }

        // "a) Decode the height class delta height as described in 6.5.6.
        // Let HCDH be the decoded value. Set: HCHEIGHT = HCHEIGHT + HCDH,
        // SYMWIDTH = 0, TOTWIDTH = 0, HCFIRSTSYM = NSYMSDECODED"
        let delta_height = coders.iadh.decode_no_oob(&mut coders.decoder)?;
        height = height
            .checked_add_signed(delta_height)
            .ok_or(DecodeError::Overflow)?;
        let mut width = 0_u32;

        ltrace!("height class of height {}", height);

        // "b) Decode each symbol within the height class as follows:"
        loop {
            // "i) Decode the delta width for the symbol as described in
            // 6.5.7. If the result of this decoding is OOB then all the
            // symbols in this height class have been decoded; proceed to step
            // 3 d)."
            let Some(delta_width) = coders.iadw.decode(&mut coders.decoder) else {
                break;
            };

            if new_symbols.len() == num_new {
                bail!(SymbolError::TooManySymbols);
            }

            width = width
                .checked_add_signed(delta_width)
                .ok_or(DecodeError::Overflow)?;
            budget.charge(width, height)?;

            // "ii) If SDHUFF is 0 or SDREFAGG is 1, then decode the symbol's
            // bitmap as described in 6.5.8."
            let symbol = match text_contexts.as_deref_mut() {
                None => generic::decode_bitmap(
                    &mut coders.decoder,
                    &mut coders.generic,
                    width,
                    height,
                    &generic_params,
                )?,
                Some(text_contexts) => decode_refinement_aggregate(
                    coders,
                    text_contexts,
                    header,
                    input,
                    &new_symbols,
                    width,
                    height,
                )?,
            };

            new_symbols.push(symbol);
        }
    }

    Ok(new_symbols)
}

/// Decode a symbol bitmap with refinement/aggregate coding (6.5.8.2).
fn decode_refinement_aggregate(
    coders: &mut Coders<'_>,
    text_contexts: &mut TextRegionContexts,
    header: &SymbolDictionaryHeader,
    input: &[&Bitmap],
    new_symbols: &[Bitmap],
    width: u32,
    height: u32,
) -> Result<Bitmap> {
    // "1) Decode the number of symbol instances contained in the aggregation,
    // as specified in 6.5.8.2.1. Let REFAGGNINST be the value decoded."
    let num_instances = coders.iaai.decode_no_oob(&mut coders.decoder)?;

    // The symbols available to the aggregation: the input symbols followed
    // by the new symbols decoded so far.
    let symbols: Vec<&Bitmap> = input.iter().copied().chain(new_symbols).collect();

    match num_instances {
        // "If REFAGGNINST is equal to one, then decode the bitmap as
        // described in 6.5.8.2.2."
        1 => {
            // "1) Decode the symbol ID [...] 2) Decode the instance refinement
            // X offset [...] 3) Decode the instance refinement Y offset"
            let id = text_contexts.iaid.decode(&mut coders.decoder) as usize;
            let rdx = text_contexts.iardx.decode_no_oob(&mut coders.decoder)?;
            let rdy = text_contexts.iardy.decode_no_oob(&mut coders.decoder)?;

            let reference = *symbols.get(id).ok_or(SymbolError::OutOfRange)?;

            ltrace!("refined symbol of symbol {}, offset ({}, {})", id, rdx, rdy);

            // Table 18.
            let params = RefinementParams {
                template: header.refinement_template,
                at: header.refinement_at,
                reference,
                dx: rdx,
                dy: rdy,
                tpgron: false,
            };

            generic_refinement::decode_bitmap(
                &mut coders.decoder,
                &mut coders.refinement,
                width,
                height,
                &params,
            )
        }
        // "2) If REFAGGNINST is greater than one, then decode the bitmap
        // itself using a text region decoding procedure as described in
        // 6.4."
        n if n > 1 => {
            ltrace!("aggregate symbol of {} instances", n);

            // Table 17.
            let params = TextRegionParams {
                width,
                height,
                refine: true,
                log_strips: 0,
                corner: ReferenceCorner::TopLeft,
                transposed: false,
                operator: CombinationOperator::Or,
                default_pixel: false,
                ds_offset: 0,
                num_instances: n as u32,
                refinement_template: header.refinement_template,
                refinement_at: header.refinement_at,
            };

            text::decode_bitmap(
                &mut coders.decoder,
                text_contexts,
                &mut coders.refinement,
                &symbols,
                &params,
            )
        }
        _ => bail!(SymbolError::OutOfRange),
    }
}

/// Compute the export flags of the input and new symbols (6.5.10).
///
/// `next_run` decodes the next run length (`EXRUNLENGTH`). Runs alternate
/// between symbols that are not exported and symbols that are, starting
/// with symbols that are not exported.
pub(crate) fn export_flags(
    num_symbols: usize,
    mut next_run: impl FnMut() -> Result<i32>,
) -> Result<Vec<bool>> {
    // "1) Set: EXINDEX = 0, CUREXFLAG = 0"
    let mut flags = Vec::with_capacity(num_symbols);
    let mut current = false;
    let mut runs = 0;

    // "5) Repeat steps 2) through 4) until EXINDEX = SDNUMINSYMS +
    // SDNUMNEWSYMS."
    while flags.len() < num_symbols {
        // A run of zero only makes sense at the start, so more runs than
        // symbols cannot come from a valid stream.
        runs += 1;
        if runs > num_symbols + 1 {
            bail!(SymbolError::ExportMismatch);
        }

        // "2) Decode a value using [...] the IAEX integer arithmetic decoding
        // procedure if SDHUFF is 0. Let EXRUNLENGTH be the decoded value."
        let run = usize::try_from(next_run()?).map_err(|_| SymbolError::ExportMismatch)?;

        if run > num_symbols - flags.len() {
            bail!(SymbolError::ExportMismatch);
        }

        // "3) Set EXFLAGS[EXINDEX] through EXFLAGS[EXINDEX + EXRUNLENGTH − 1]
        // to CUREXFLAG. 4) Set: EXINDEX = EXINDEX + EXRUNLENGTH,
        // CUREXFLAG = NOT(CUREXFLAG)"
        flags.resize(flags.len() + run, current);
        current = !current;
    }

    Ok(flags)
}
