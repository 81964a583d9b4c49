//! Localized (Turkish) titles and actions for known opportunity keys

/// A localized title/detail pair for one opportunity key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub title: &'static str,
    pub detail: &'static str,
}

const fn tr(title: &'static str, detail: &'static str) -> Translation {
    Translation { title, detail }
}

/// Static catalog keyed by Lighthouse audit id
const CATALOG: &[(&str, Translation)] = &[
    (
        "render-blocking-resources",
        tr(
            "Render Engelleyen Kaynakları Azaltın",
            "CSS ve JavaScript dosyalarını async/defer ile yükleyin. Kritik CSS'i inline yapın.",
        ),
    ),
    (
        "unused-javascript",
        tr(
            "Kullanılmayan JavaScript'i Kaldırın",
            "Kullanılmayan JS kodlarını tespit edip silin. Code splitting uygulayın.",
        ),
    ),
    (
        "unused-css-rules",
        tr(
            "Kullanılmayan CSS'i Temizleyin",
            "PurgeCSS veya benzeri araçlarla kullanılmayan stilleri kaldırın.",
        ),
    ),
    (
        "unminified-javascript",
        tr(
            "JavaScript'i Sıkıştırın",
            "Terser veya UglifyJS ile JS dosyalarını minify edin.",
        ),
    ),
    (
        "unminified-css",
        tr(
            "CSS'i Sıkıştırın",
            "CSS dosyalarını cssnano veya benzeri araçlarla minify edin.",
        ),
    ),
    (
        "modern-image-formats",
        tr(
            "Modern Görsel Formatlarına Geçin",
            "JPEG/PNG yerine WebP veya AVIF formatlarını kullanın. %25-50 tasarruf sağlar.",
        ),
    ),
    (
        "uses-optimized-images",
        tr(
            "Görselleri Optimize Edin",
            "Görselleri sıkıştırın (TinyPNG, ImageOptim). Boyutları küçültün.",
        ),
    ),
    (
        "offscreen-images",
        tr(
            "Görünmeyen Görselleri Lazy Load Yapın",
            "loading='lazy' özelliğini ekleyin. Viewport dışındaki görselleri erteleyin.",
        ),
    ),
    (
        "uses-responsive-images",
        tr(
            "Responsive Görseller Kullanın",
            "srcset ve sizes özelliklerini kullanarak farklı ekranlara uygun görseller sunun.",
        ),
    ),
    (
        "efficiently-encode-images",
        tr(
            "Görselleri Verimli Kodlayın",
            "Görselleri JPEG quality 80-85 ile optimize edin.",
        ),
    ),
    (
        "uses-text-compression",
        tr(
            "Metin Sıkıştırma (Gzip/Brotli) Etkinleştirin",
            "Sunucu ayarlarından Gzip veya Brotli sıkıştırmayı aktif edin.",
        ),
    ),
    (
        "uses-rel-preconnect",
        tr(
            "Erken Bağlantı Kurulumunu Etkinleştirin",
            "3. parti kaynaklara <link rel='preconnect'> ekleyin.",
        ),
    ),
    (
        "uses-rel-preload",
        tr(
            "Kritik Kaynakları Önceden Yükleyin",
            "Önemli font ve CSS dosyalarına <link rel='preload'> ekleyin.",
        ),
    ),
    (
        "server-response-time",
        tr(
            "Sunucu Yanıt Süresini Azaltın (TTFB)",
            "CDN kullanın, veritabanı sorgularını optimize edin, caching ekleyin.",
        ),
    ),
    (
        "redirects",
        tr(
            "Yönlendirmeleri Azaltın",
            "Gereksiz redirect zincirlerini kaldırın. Doğrudan URL'lere yönlendirin.",
        ),
    ),
    (
        "uses-http2",
        tr(
            "HTTP/2 Protokolünü Kullanın",
            "Sunucunuzu HTTP/2 destekleyecek şekilde yapılandırın.",
        ),
    ),
    (
        "dom-size",
        tr(
            "DOM Boyutunu Küçültün",
            "Gereksiz HTML elementlerini kaldırın. Virtual scrolling uygulayın.",
        ),
    ),
    (
        "critical-request-chains",
        tr(
            "Kritik İstek Zincirlerini Kısaltın",
            "Kritik kaynakları inline yapın veya preload ile önceden yükleyin.",
        ),
    ),
    (
        "bootup-time",
        tr(
            "JavaScript Çalışma Süresini Azaltın",
            "Ağır JS işlemlerini Web Worker'lara taşıyın. Code splitting yapın.",
        ),
    ),
    (
        "mainthread-work-breakdown",
        tr(
            "Ana İş Parçacığı Yükünü Azaltın",
            "JS çalışmasını optimize edin. Uzun görevleri parçalara ayırın.",
        ),
    ),
    (
        "font-display",
        tr(
            "Font Görüntüleme Stratejisini Optimize Edin",
            "font-display: swap kullanarak FOIT sorununu önleyin.",
        ),
    ),
    (
        "third-party-summary",
        tr(
            "3. Parti Scriptleri Optimize Edin",
            "Gereksiz 3. parti scriptleri kaldırın veya erteleyin (analytics, chat widget vb.)",
        ),
    ),
    (
        "largest-contentful-paint-element",
        tr(
            "LCP Elementini Optimize Edin",
            "Ana hero görselini preload yapın. CDN kullanın. Boyutunu küçültün.",
        ),
    ),
    (
        "lcp-lazy-loaded",
        tr(
            "LCP Görseli Lazy Load Edilmiş",
            "LCP (hero) görselinden loading='lazy' özelliğini kaldırın!",
        ),
    ),
    (
        "total-blocking-time",
        tr(
            "Toplam Engelleme Süresini Azaltın",
            "Uzun JavaScript görevlerini bölün. Ana thread'i serbest bırakın.",
        ),
    ),
    (
        "cumulative-layout-shift",
        tr(
            "Görsel Kaymaları (CLS) Engelleyin",
            "Görsel ve iframe'lere width/height ekleyin. Font FOUT'unu önleyin.",
        ),
    ),
    (
        "prioritize-lcp-image",
        tr(
            "LCP Görselini Önceliklendirin",
            "fetchpriority='high' ve preload ile LCP görselini önceliklendirin.",
        ),
    ),
    (
        "legacy-javascript",
        tr(
            "Eski JavaScript Polyfill'leri Kaldırın",
            "Modern tarayıcılar için gereksiz polyfill'leri kaldırın.",
        ),
    ),
    (
        "duplicated-javascript",
        tr(
            "Tekrarlanan JS Modüllerini Temizleyin",
            "Webpack/Rollup bundle analizi yapın, duplicate modülleri kaldırın.",
        ),
    ),
];

/// Look up the translation for an opportunity key
pub fn lookup(key: &str) -> Option<Translation> {
    CATALOG
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, translation)| *translation)
}

/// Number of keys with a translation
pub fn catalog_size() -> usize {
    CATALOG.len()
}
