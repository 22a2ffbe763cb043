//! Lookup tables for foreign-content name adjustment: historically
//! camel-cased SVG tag and attribute spellings, the MathML
//! `definitionURL` special case, and the cross-namespace xlink/xml/xmlns
//! attribute rewrites.

use phf::{phf_map, Map};

/// Lowercased SVG tag names and their canonical camelCase spellings.
pub static SVG_ADJUSTMENTS_TAGS: Map<&'static str, &'static str> = phf_map! {
    "altglyph" => "altGlyph",
    "altglyphdef" => "altGlyphDef",
    "altglyphitem" => "altGlyphItem",
    "animatecolor" => "animateColor",
    "animatemotion" => "animateMotion",
    "animatetransform" => "animateTransform",
    "clippath" => "clipPath",
    "feblend" => "feBlend",
    "fecolormatrix" => "feColorMatrix",
    "fecomponenttransfer" => "feComponentTransfer",
    "fecomposite" => "feComposite",
    "feconvolvematrix" => "feConvolveMatrix",
    "fediffuselighting" => "feDiffuseLighting",
    "fedisplacementmap" => "feDisplacementMap",
    "fedistantlight" => "feDistantLight",
    "fedropshadow" => "feDropShadow",
    "feflood" => "feFlood",
    "fefunca" => "feFuncA",
    "fefuncb" => "feFuncB",
    "fefuncg" => "feFuncG",
    "fefuncr" => "feFuncR",
    "fegaussianblur" => "feGaussianBlur",
    "feimage" => "feImage",
    "femerge" => "feMerge",
    "femergenode" => "feMergeNode",
    "femorphology" => "feMorphology",
    "feoffset" => "feOffset",
    "fepointlight" => "fePointLight",
    "fespecularlighting" => "feSpecularLighting",
    "fespotlight" => "feSpotLight",
    "fetile" => "feTile",
    "feturbulence" => "feTurbulence",
    "foreignobject" => "foreignObject",
    "glyphref" => "glyphRef",
    "lineargradient" => "linearGradient",
    "radialgradient" => "radialGradient",
    "textpath" => "textPath",
};

/// Lowercased SVG attribute names and their canonical spellings.
pub static SVG_ADJUSTMENTS_ATTRIBUTES: Map<&'static str, &'static str> = phf_map! {
    "attributename" => "attributeName",
    "attributetype" => "attributeType",
    "basefrequency" => "baseFrequency",
    "baseprofile" => "baseProfile",
    "calcmode" => "calcMode",
    "clippathunits" => "clipPathUnits",
    "diffuseconstant" => "diffuseConstant",
    "edgemode" => "edgeMode",
    "filterunits" => "filterUnits",
    "glyphref" => "glyphRef",
    "gradienttransform" => "gradientTransform",
    "gradientunits" => "gradientUnits",
    "kernelmatrix" => "kernelMatrix",
    "kernelunitlength" => "kernelUnitLength",
    "keypoints" => "keyPoints",
    "keysplines" => "keySplines",
    "keytimes" => "keyTimes",
    "lengthadjust" => "lengthAdjust",
    "limitingconeangle" => "limitingConeAngle",
    "markerheight" => "markerHeight",
    "markerunits" => "markerUnits",
    "markerwidth" => "markerWidth",
    "maskcontentunits" => "maskContentUnits",
    "maskunits" => "maskUnits",
    "numoctaves" => "numOctaves",
    "pathlength" => "pathLength",
    "patterncontentunits" => "patternContentUnits",
    "patterntransform" => "patternTransform",
    "patternunits" => "patternUnits",
    "pointsatx" => "pointsAtX",
    "pointsaty" => "pointsAtY",
    "pointsatz" => "pointsAtZ",
    "preservealpha" => "preserveAlpha",
    "preserveaspectratio" => "preserveAspectRatio",
    "primitiveunits" => "primitiveUnits",
    "refx" => "refX",
    "refy" => "refY",
    "repeatcount" => "repeatCount",
    "repeatdur" => "repeatDur",
    "requiredextensions" => "requiredExtensions",
    "requiredfeatures" => "requiredFeatures",
    "specularconstant" => "specularConstant",
    "specularexponent" => "specularExponent",
    "spreadmethod" => "spreadMethod",
    "startoffset" => "startOffset",
    "stddeviation" => "stdDeviation",
    "stitchtiles" => "stitchTiles",
    "surfacescale" => "surfaceScale",
    "systemlanguage" => "systemLanguage",
    "tablevalues" => "tableValues",
    "targetx" => "targetX",
    "targety" => "targetY",
    "textlength" => "textLength",
    "viewbox" => "viewBox",
    "viewtarget" => "viewTarget",
    "xchannelselector" => "xChannelSelector",
    "ychannelselector" => "yChannelSelector",
    "zoomandpan" => "zoomAndPan",
};

/// MathML attribute adjustments.
pub static MATHML_ADJUSTMENTS: Map<&'static str, &'static str> = phf_map! {
    "definitionurl" => "definitionURL",
};

/// Cross-namespace attribute rewrites: name to (prefix, local name). The
/// xmlns entry intentionally keeps an empty prefix.
pub static XML_ADJUSTMENTS: Map<&'static str, (&'static str, &'static str)> = phf_map! {
    "xlink:actuate" => ("xlink", "actuate"),
    "xlink:arcrole" => ("xlink", "arcrole"),
    "xlink:href" => ("xlink", "href"),
    "xlink:role" => ("xlink", "role"),
    "xlink:show" => ("xlink", "show"),
    "xlink:title" => ("xlink", "title"),
    "xlink:type" => ("xlink", "type"),
    "xml:lang" => ("xml", "lang"),
    "xml:space" => ("xml", "space"),
    "xmlns" => ("", "xmlns"),
    "xmlns:xlink" => ("xmlns", "xlink"),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_tag_rewrite() {
        assert_eq!(SVG_ADJUSTMENTS_TAGS.get("foreignobject"), Some(&"foreignObject"));
        assert_eq!(SVG_ADJUSTMENTS_TAGS.get("clippath"), Some(&"clipPath"));
        assert!(SVG_ADJUSTMENTS_TAGS.get("rect").is_none());
    }

    #[test]
    fn svg_attribute_rewrite() {
        assert_eq!(SVG_ADJUSTMENTS_ATTRIBUTES.get("viewbox"), Some(&"viewBox"));
        assert!(SVG_ADJUSTMENTS_ATTRIBUTES.get("width").is_none());
    }

    #[test]
    fn mathml_attribute_rewrite() {
        assert_eq!(MATHML_ADJUSTMENTS.get("definitionurl"), Some(&"definitionURL"));
    }

    #[test]
    fn xml_attribute_rewrite() {
        let (prefix, local) = XML_ADJUSTMENTS.get("xlink:href").expect("xlink:href");
        assert_eq!((*prefix, *local), ("xlink", "href"));
    }
}
